//! Studio event bus.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`. Every draft and clip mutation is published
//!   here so any consumer can follow the draft list without polling.
//! - [`StudioEvent`]: the event envelope.
//! - [`EventJournal`]: background task that writes every event to the log.

pub mod bus;
pub mod journal;

pub use bus::{EventBus, StudioEvent};
pub use journal::EventJournal;
