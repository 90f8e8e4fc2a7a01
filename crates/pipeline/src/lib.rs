//! Job orchestration and state reconciliation for draft shots.
//!
//! A shot moves through synthesis, optional voice conversion and rendering,
//! each backed by an external service reached through the traits in
//! [`ports`]. The [`draft_store::DraftStore`] owns the local draft list, the
//! [`reconcile::ReconciliationEngine`] keeps it consistent with the remote
//! clip store, and [`studio::Studio`] ties everything together.

pub mod clip_bin;
pub mod clock;
pub mod conversion;
pub mod draft_store;
pub mod error;
pub mod memory_store;
pub mod ports;
pub mod reconcile;
pub mod registry;
pub mod render;
pub mod storage;
pub mod studio;
pub mod synthesis;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{CaptureError, StorageError, StoreError};
pub use studio::{Studio, StudioConfig, StudioDeps};
