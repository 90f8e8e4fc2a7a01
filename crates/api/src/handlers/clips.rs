//! Handlers for the `/clips` resource (the bin).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use storyshot_core::types::DbId;
use storyshot_pipeline::clip_bin::BinClip;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/clips
///
/// The local view, including unconfirmed entries. Use `/clips/refresh` to
/// reconcile with the store first.
pub async fn list(State(state): State<AppState>) -> Json<DataResponse<Vec<BinClip>>> {
    Json(DataResponse {
        data: state.studio.list_clips().await,
    })
}

/// POST /api/v1/clips/refresh
pub async fn refresh(State(state): State<AppState>) -> AppResult<Json<DataResponse<Vec<BinClip>>>> {
    let clips = state.studio.refresh_clips().await?;
    Ok(Json(DataResponse { data: clips }))
}

/// DELETE /api/v1/clips/{id}
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    state.studio.delete_clip(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
