use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::clips;
use crate::state::AppState;

/// Routes mounted at `/clips`.
///
/// ```text
/// GET    /          -> list
/// POST   /refresh   -> refresh
/// DELETE /{id}      -> delete
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(clips::list))
        .route("/refresh", post(clips::refresh))
        .route("/{id}", delete(clips::delete))
}
