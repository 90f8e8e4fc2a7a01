use axum::routing::get;
use axum::Router;

use crate::handlers::voices;
use crate::state::AppState;

/// Routes mounted at `/voices`.
///
/// ```text
/// GET    /   -> get_library
/// PUT    /   -> replace_library
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(voices::get_library).put(voices::replace_library))
}
