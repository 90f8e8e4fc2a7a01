pub mod clips;
pub mod health;
pub mod shots;
pub mod voices;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /shots                                       list, create
/// /shots/{local_id}                            get, update, discard
/// /shots/{local_id}/audio                      generate dialogue audio (POST)
/// /shots/{local_id}/render                     render video (POST)
/// /shots/{local_id}/produce                    audio then video (POST)
/// /shots/{local_id}/save                       save to bin (POST)
/// /shots/{local_id}/capture                    start capture (POST)
/// /shots/{local_id}/capture/stop               stop capture (POST)
/// /shots/{local_id}/blocks/{block_id}/audio    re-voice uploaded take (POST)
///
/// /clips                                       list bin
/// /clips/refresh                               reconcile with store (POST)
/// /clips/{id}                                  delete
///
/// /voices                                      get, replace library
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/shots", shots::router())
        .nest("/clips", clips::router())
        .nest("/voices", voices::router())
}
