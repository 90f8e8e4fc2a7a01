//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`StudioEvent`]s. It is
//! shared via `Arc<EventBus>` between the draft store, the reconciliation
//! engine and the HTTP layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storyshot_core::types::{DbId, LocalId};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// Event names
// ---------------------------------------------------------------------------

pub const SHOT_CREATED: &str = "shot.created";
pub const SHOT_UPDATED: &str = "shot.updated";
pub const SHOT_STATUS_CHANGED: &str = "shot.status_changed";
pub const SHOT_REMOVED: &str = "shot.removed";
pub const SHOT_HEALED: &str = "shot.healed";
pub const CLIP_UPSERTED: &str = "clip.upserted";
pub const CLIP_REMOVED: &str = "clip.removed";
pub const CLIPS_REFRESHED: &str = "clips.refreshed";

// ---------------------------------------------------------------------------
// StudioEvent
// ---------------------------------------------------------------------------

/// A change to a draft shot or a clip.
///
/// Constructed via [`StudioEvent::new`] and enriched with
/// [`for_shot`](StudioEvent::for_shot), [`with_remote`](StudioEvent::with_remote),
/// [`with_status`](StudioEvent::with_status) and
/// [`with_payload`](StudioEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudioEvent {
    /// Dot-separated event name, e.g. `"shot.status_changed"`.
    pub event_type: String,

    /// Draft the event concerns, if any.
    pub local_id: Option<LocalId>,

    /// Remote clip id, once one exists.
    pub remote_id: Option<DbId>,

    /// New status after the change, as its wire string.
    pub status: Option<String>,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl StudioEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            local_id: None,
            remote_id: None,
            status: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn for_shot(mut self, local_id: LocalId) -> Self {
        self.local_id = Some(local_id);
        self
    }

    pub fn with_remote(mut self, remote_id: Option<DbId>) -> Self {
        self.remote_id = remote_id;
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// When the buffer is full the oldest un-consumed events are dropped and slow
/// receivers observe `RecvError::Lagged`.
pub struct EventBus {
    sender: broadcast::Sender<StudioEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// With no subscribers the event is dropped.
    pub fn publish(&self, event: StudioEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StudioEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
