use axum::routing::{get, post};
use axum::Router;

use crate::handlers::shots;
use crate::state::AppState;

/// Routes mounted at `/shots`.
///
/// ```text
/// GET    /                                  -> list
/// POST   /                                  -> create
/// GET    /{local_id}                        -> get_by_id
/// PUT    /{local_id}                        -> update
/// DELETE /{local_id}                        -> discard
/// POST   /{local_id}/audio                  -> generate_audio
/// POST   /{local_id}/render                 -> render
/// POST   /{local_id}/produce                -> produce
/// POST   /{local_id}/save                   -> save_to_bin
/// POST   /{local_id}/capture                -> start_capture
/// POST   /{local_id}/capture/stop           -> stop_capture
/// POST   /{local_id}/blocks/{block_id}/audio -> revoice_block
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(shots::list).post(shots::create))
        .route(
            "/{local_id}",
            get(shots::get_by_id)
                .put(shots::update)
                .delete(shots::discard),
        )
        .route("/{local_id}/audio", post(shots::generate_audio))
        .route("/{local_id}/render", post(shots::render))
        .route("/{local_id}/produce", post(shots::produce))
        .route("/{local_id}/save", post(shots::save_to_bin))
        .route("/{local_id}/capture", post(shots::start_capture))
        .route("/{local_id}/capture/stop", post(shots::stop_capture))
        .route(
            "/{local_id}/blocks/{block_id}/audio",
            post(shots::revoice_block),
        )
}
