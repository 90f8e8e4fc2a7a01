//! Registry of in-flight jobs and captures, keyed by shot.
//!
//! Each registered job gets a child [`CancellationToken`]. Discarding a shot
//! cancels every token registered for it, and shutting down cancels the
//! root. Tickets deregister themselves when dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use storyshot_core::error::JobError;
use storyshot_core::types::LocalId;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Synthesis,
    Conversion,
    Render,
    Capture,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Synthesis => "synthesis",
            Self::Conversion => "conversion",
            Self::Render => "render",
            Self::Capture => "capture",
        }
    }
}

#[derive(Debug)]
struct Entry {
    serial: u64,
    token: CancellationToken,
}

type Jobs = HashMap<(LocalId, JobKind), Entry>;

#[derive(Debug)]
pub struct JobRegistry {
    root: CancellationToken,
    jobs: Mutex<Jobs>,
    next_serial: AtomicU64,
}

impl JobRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            root: CancellationToken::new(),
            jobs: Mutex::new(HashMap::new()),
            next_serial: AtomicU64::new(1),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Jobs> {
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a job. Fails with `Conflict` while another job of the same
    /// kind is live for the shot.
    pub fn begin(self: &Arc<Self>, local_id: LocalId, kind: JobKind) -> Result<JobTicket, JobError> {
        let mut jobs = self.lock();
        let key = (local_id, kind);
        if jobs.get(&key).is_some_and(|e| !e.token.is_cancelled()) {
            return Err(JobError::Conflict(format!(
                "A {} job is already running for shot {local_id}",
                kind.as_str()
            )));
        }

        let serial = self.next_serial.fetch_add(1, Ordering::Relaxed);
        let token = self.root.child_token();
        jobs.insert(
            key,
            Entry {
                serial,
                token: token.clone(),
            },
        );
        tracing::debug!(%local_id, kind = kind.as_str(), "Job registered");

        Ok(JobTicket {
            registry: Arc::clone(self),
            local_id,
            kind,
            serial,
            token,
        })
    }

    #[cfg(test)]
    fn is_active(&self, local_id: LocalId, kind: JobKind) -> bool {
        self.lock().contains_key(&(local_id, kind))
    }

    /// Cancel and forget every job of a shot. Returns how many were cancelled.
    pub fn cancel_all(&self, local_id: LocalId) -> usize {
        let mut jobs = self.lock();
        let keys: Vec<_> = jobs.keys().filter(|(id, _)| *id == local_id).copied().collect();
        for key in &keys {
            if let Some(entry) = jobs.remove(key) {
                entry.token.cancel();
            }
        }
        if !keys.is_empty() {
            tracing::info!(%local_id, cancelled = keys.len(), "Cancelled jobs for shot");
        }
        keys.len()
    }

    /// Cancel everything, including jobs registered later.
    pub fn shutdown(&self) {
        self.root.cancel();
    }

    fn release(&self, local_id: LocalId, kind: JobKind, serial: u64) {
        let mut jobs = self.lock();
        if jobs.get(&(local_id, kind)).is_some_and(|e| e.serial == serial) {
            jobs.remove(&(local_id, kind));
        }
    }
}

/// Handle for one registered job. Dropping it deregisters the job.
#[derive(Debug)]
pub struct JobTicket {
    registry: Arc<JobRegistry>,
    local_id: LocalId,
    kind: JobKind,
    serial: u64,
    token: CancellationToken,
}

impl JobTicket {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for JobTicket {
    fn drop(&mut self) {
        self.registry.release(self.local_id, self.kind, self.serial);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn second_job_of_same_kind_conflicts() {
        let registry = JobRegistry::new();
        let id = uuid::Uuid::new_v4();
        let _ticket = registry.begin(id, JobKind::Render).unwrap();

        assert_matches!(registry.begin(id, JobKind::Render), Err(JobError::Conflict(_)));
        assert!(registry.begin(id, JobKind::Synthesis).is_ok());
    }

    #[test]
    fn dropping_ticket_deregisters() {
        let registry = JobRegistry::new();
        let id = uuid::Uuid::new_v4();
        let ticket = registry.begin(id, JobKind::Render).unwrap();
        assert!(registry.is_active(id, JobKind::Render));
        drop(ticket);
        assert!(!registry.is_active(id, JobKind::Render));
    }

    #[test]
    fn cancel_all_cancels_only_that_shot() {
        let registry = JobRegistry::new();
        let a = uuid::Uuid::new_v4();
        let b = uuid::Uuid::new_v4();
        let a1 = registry.begin(a, JobKind::Synthesis).unwrap();
        let a2 = registry.begin(a, JobKind::Capture).unwrap();
        let b1 = registry.begin(b, JobKind::Synthesis).unwrap();

        assert_eq!(registry.cancel_all(a), 2);
        assert!(a1.token().is_cancelled());
        assert!(a2.token().is_cancelled());
        assert!(!b1.token().is_cancelled());

        // The shot can start fresh work once the old jobs are gone.
        let again = registry.begin(a, JobKind::Synthesis).unwrap();
        drop(a1);
        assert!(registry.is_active(a, JobKind::Synthesis));
        drop(again);
    }

    #[test]
    fn shutdown_cancels_everything() {
        let registry = JobRegistry::new();
        let ticket = registry.begin(uuid::Uuid::new_v4(), JobKind::Render).unwrap();
        registry.shutdown();
        assert!(ticket.token().is_cancelled());
    }
}
