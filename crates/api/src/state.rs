use std::sync::Arc;

use storyshot_pipeline::Studio;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The studio engine.
    pub studio: Arc<Studio>,
    /// Database pool when a remote clip store is configured.
    pub pool: Option<storyshot_db::DbPool>,
}
