//! Event journal.
//!
//! [`EventJournal`] subscribes to the [`EventBus`](crate::bus::EventBus) and
//! writes every [`StudioEvent`] to the tracing log. It runs as a long-lived
//! background task and stops when the bus is dropped.

use tokio::sync::broadcast;

use crate::bus::StudioEvent;

/// Background service that logs studio events.
pub struct EventJournal;

impl EventJournal {
    /// Run the journal loop until the channel closes.
    ///
    /// Returns the number of events written.
    pub async fn run(mut receiver: broadcast::Receiver<StudioEvent>) -> u64 {
        let mut written = 0u64;
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    Self::write(&event);
                    written += 1;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event journal lagged, some events were not logged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!(written, "Event bus closed, journal shutting down");
                    break;
                }
            }
        }
        written
    }

    fn write(event: &StudioEvent) {
        tracing::info!(
            event_type = %event.event_type,
            local_id = ?event.local_id,
            remote_id = ?event.remote_id,
            status = event.status.as_deref().unwrap_or("-"),
            "Studio event",
        );
    }
}
