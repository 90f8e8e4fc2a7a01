//! Handlers for the `/shots` resource (drafts).
//!
//! Generation endpoints return `202 Accepted` with the shot in its new
//! status; the work finishes in the background and is observed by polling
//! the shot.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use storyshot_core::shot::Shot;
use storyshot_core::types::LocalId;
use storyshot_pipeline::clip_bin::BinClip;
use storyshot_pipeline::draft_store::ShotChanges;
use storyshot_pipeline::ports::CapturedAudio;
use storyshot_pipeline::studio::NewShot;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /shots/{local_id}/capture`.
#[derive(Debug, Deserialize)]
pub struct StartCapture {
    pub block_id: Uuid,
}

/// Body of `POST /shots/{local_id}/blocks/{block_id}/audio`.
#[derive(Debug, Deserialize)]
pub struct UploadedAudio {
    /// Raw audio, base64 encoded. A `data:` URI prefix is tolerated.
    pub audio_base64: String,
    #[serde(default = "default_mime")]
    pub mime: String,
}

fn default_mime() -> String {
    "audio/wav".to_string()
}

impl UploadedAudio {
    fn decode(self) -> AppResult<CapturedAudio> {
        let encoded = match self.audio_base64.split_once(";base64,") {
            Some((_, payload)) => payload,
            None => self.audio_base64.as_str(),
        };
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| AppError::BadRequest(format!("audio_base64 is not valid base64: {e}")))?;
        if bytes.is_empty() {
            return Err(AppError::BadRequest("audio_base64 is empty".to_string()));
        }
        Ok(CapturedAudio {
            bytes,
            mime: self.mime,
        })
    }
}

/// GET /api/v1/shots
pub async fn list(State(state): State<AppState>) -> Json<DataResponse<Vec<Shot>>> {
    Json(DataResponse {
        data: state.studio.list_shots().await,
    })
}

/// POST /api/v1/shots
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<NewShot>,
) -> AppResult<(StatusCode, Json<DataResponse<Shot>>)> {
    let shot = state.studio.create_shot(input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: shot })))
}

/// GET /api/v1/shots/{local_id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(local_id): Path<LocalId>,
) -> AppResult<Json<DataResponse<Shot>>> {
    let shot = state.studio.get_shot(local_id).await?;
    Ok(Json(DataResponse { data: shot }))
}

/// PUT /api/v1/shots/{local_id}
///
/// Partial update; absent fields are left unchanged.
pub async fn update(
    State(state): State<AppState>,
    Path(local_id): Path<LocalId>,
    Json(changes): Json<ShotChanges>,
) -> AppResult<Json<DataResponse<Shot>>> {
    let shot = state.studio.update_shot(local_id, changes).await?;
    Ok(Json(DataResponse { data: shot }))
}

/// DELETE /api/v1/shots/{local_id}
///
/// Discards the draft and cancels its running jobs.
pub async fn discard(
    State(state): State<AppState>,
    Path(local_id): Path<LocalId>,
) -> AppResult<StatusCode> {
    state.studio.discard_shot(local_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/shots/{local_id}/audio
pub async fn generate_audio(
    State(state): State<AppState>,
    Path(local_id): Path<LocalId>,
) -> AppResult<(StatusCode, Json<DataResponse<Shot>>)> {
    let shot = state.studio.generate_audio(local_id).await?;
    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: shot })))
}

/// POST /api/v1/shots/{local_id}/render
pub async fn render(
    State(state): State<AppState>,
    Path(local_id): Path<LocalId>,
) -> AppResult<(StatusCode, Json<DataResponse<Shot>>)> {
    let shot = state.studio.render(local_id).await?;
    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: shot })))
}

/// POST /api/v1/shots/{local_id}/produce
pub async fn produce(
    State(state): State<AppState>,
    Path(local_id): Path<LocalId>,
) -> AppResult<(StatusCode, Json<DataResponse<Shot>>)> {
    let shot = state.studio.produce(local_id).await?;
    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: shot })))
}

/// POST /api/v1/shots/{local_id}/save
///
/// Moves a previewed shot into the bin. The draft is removed.
pub async fn save_to_bin(
    State(state): State<AppState>,
    Path(local_id): Path<LocalId>,
) -> AppResult<(StatusCode, Json<DataResponse<BinClip>>)> {
    let clip = state.studio.save_to_bin(local_id).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: clip })))
}

/// POST /api/v1/shots/{local_id}/capture
pub async fn start_capture(
    State(state): State<AppState>,
    Path(local_id): Path<LocalId>,
    Json(input): Json<StartCapture>,
) -> AppResult<StatusCode> {
    state.studio.start_capture(local_id, input.block_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/shots/{local_id}/capture/stop
pub async fn stop_capture(
    State(state): State<AppState>,
    Path(local_id): Path<LocalId>,
) -> AppResult<(StatusCode, Json<DataResponse<Shot>>)> {
    let shot = state.studio.stop_capture(local_id).await?;
    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: shot })))
}

/// POST /api/v1/shots/{local_id}/blocks/{block_id}/audio
///
/// Stands in for the capture device: the client uploads a take which is
/// converted towards the block's voice.
pub async fn revoice_block(
    State(state): State<AppState>,
    Path((local_id, block_id)): Path<(LocalId, Uuid)>,
    Json(input): Json<UploadedAudio>,
) -> AppResult<(StatusCode, Json<DataResponse<Shot>>)> {
    let audio = input.decode()?;
    let shot = state.studio.revoice_block(local_id, block_id, audio).await?;
    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: shot })))
}
