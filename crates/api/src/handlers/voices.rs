use axum::extract::State;
use axum::Json;
use storyshot_core::voice::VoiceLibrary;

use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/voices
pub async fn get_library(State(state): State<AppState>) -> Json<DataResponse<VoiceLibrary>> {
    Json(DataResponse {
        data: state.studio.voice_library().await,
    })
}

/// PUT /api/v1/voices
///
/// Replaces the characters and registry voices used to resolve speakers.
pub async fn replace_library(
    State(state): State<AppState>,
    Json(library): Json<VoiceLibrary>,
) -> Json<DataResponse<VoiceLibrary>> {
    state.studio.set_voice_library(library.clone()).await;
    Json(DataResponse { data: library })
}
