//! Clip models and DTOs.
//!
//! A clip is the durable, server-keyed record of a shot. It is written in two
//! phases (pending, then completed) and is the source of truth once it
//! exists.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use storyshot_core::clip_status::ClipStatus;
use storyshot_core::types::{DbId, LocalId, Timestamp};

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A clip row from the `clips` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Clip {
    pub id: DbId,
    pub local_id: LocalId,
    pub scene_ref: Option<String>,
    pub name: String,
    pub status: String,
    pub speaker_mode: String,
    pub dialogue: serde_json::Value,
    pub visual_prompt: String,
    pub motion_preset: Option<String>,
    pub keyframe_ref: Option<String>,
    pub audio_ref: Option<String>,
    pub media_ref: Option<String>,
    pub last_frame_ref: Option<String>,
    pub duration_secs: Option<f64>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Clip {
    /// Typed status. Unknown values (written by a newer schema) read as
    /// `Pending` so they are treated as still in flight.
    pub fn clip_status(&self) -> ClipStatus {
        ClipStatus::parse(&self.status).unwrap_or(ClipStatus::Pending)
    }
}

// ---------------------------------------------------------------------------
// Upsert DTO
// ---------------------------------------------------------------------------

/// Input for inserting or updating a clip.
///
/// `id = None` inserts (keyed on `local_id`, so a retried insert updates the
/// existing row); `id = Some` updates that row in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpsertClip {
    pub id: Option<DbId>,
    pub local_id: LocalId,
    pub scene_ref: Option<String>,
    pub name: String,
    pub status: ClipStatus,
    pub speaker_mode: String,
    pub dialogue: serde_json::Value,
    pub visual_prompt: String,
    pub motion_preset: Option<String>,
    pub keyframe_ref: Option<String>,
    pub audio_ref: Option<String>,
    pub media_ref: Option<String>,
    pub last_frame_ref: Option<String>,
    pub duration_secs: Option<f64>,
}

// ---------------------------------------------------------------------------
// Query filter
// ---------------------------------------------------------------------------

/// Filters for listing clips. Results are always newest first.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClipFilter {
    pub scene_ref: Option<String>,
    pub status: Option<ClipStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Default page size for clip listings.
pub const DEFAULT_CLIP_LIMIT: i64 = 100;

/// Upper bound on a single clip listing page.
pub const MAX_CLIP_LIMIT: i64 = 500;

impl ClipFilter {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_CLIP_LIMIT).clamp(1, MAX_CLIP_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}
