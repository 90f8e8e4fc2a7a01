//! Repository for the `clips` table.
//!
//! Every write is an upsert keyed by identifier, so retrying a write with the
//! same data never creates a second row.

use sqlx::PgPool;
use storyshot_core::types::DbId;

use crate::models::clip::{Clip, ClipFilter, UpsertClip};

/// Column list for clips queries.
const COLUMNS: &str = "id, local_id, scene_ref, name, status, speaker_mode, dialogue, \
    visual_prompt, motion_preset, keyframe_ref, audio_ref, media_ref, last_frame_ref, \
    duration_secs, created_at, updated_at";

/// Provides upsert, lookup, listing and deletion for clips.
pub struct ClipRepo;

impl ClipRepo {
    /// Insert a clip, or update the row already holding `local_id`.
    pub async fn insert(pool: &PgPool, input: &UpsertClip) -> Result<Clip, sqlx::Error> {
        let query = format!(
            "INSERT INTO clips
                (local_id, scene_ref, name, status, speaker_mode, dialogue, visual_prompt,
                 motion_preset, keyframe_ref, audio_ref, media_ref, last_frame_ref, duration_secs)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             ON CONFLICT (local_id) DO UPDATE SET
                scene_ref = EXCLUDED.scene_ref,
                name = EXCLUDED.name,
                status = EXCLUDED.status,
                speaker_mode = EXCLUDED.speaker_mode,
                dialogue = EXCLUDED.dialogue,
                visual_prompt = EXCLUDED.visual_prompt,
                motion_preset = EXCLUDED.motion_preset,
                keyframe_ref = EXCLUDED.keyframe_ref,
                audio_ref = EXCLUDED.audio_ref,
                media_ref = EXCLUDED.media_ref,
                last_frame_ref = EXCLUDED.last_frame_ref,
                duration_secs = EXCLUDED.duration_secs,
                updated_at = now()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Clip>(&query)
            .bind(input.local_id)
            .bind(&input.scene_ref)
            .bind(&input.name)
            .bind(input.status.as_str())
            .bind(&input.speaker_mode)
            .bind(&input.dialogue)
            .bind(&input.visual_prompt)
            .bind(&input.motion_preset)
            .bind(&input.keyframe_ref)
            .bind(&input.audio_ref)
            .bind(&input.media_ref)
            .bind(&input.last_frame_ref)
            .bind(input.duration_secs)
            .fetch_one(pool)
            .await
    }

    /// Update a clip in place by id. Returns `None` if the row is gone.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpsertClip,
    ) -> Result<Option<Clip>, sqlx::Error> {
        let query = format!(
            "UPDATE clips SET
                scene_ref = $2,
                name = $3,
                status = $4,
                speaker_mode = $5,
                dialogue = $6,
                visual_prompt = $7,
                motion_preset = $8,
                keyframe_ref = $9,
                audio_ref = $10,
                media_ref = $11,
                last_frame_ref = $12,
                duration_secs = $13,
                updated_at = now()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Clip>(&query)
            .bind(id)
            .bind(&input.scene_ref)
            .bind(&input.name)
            .bind(input.status.as_str())
            .bind(&input.speaker_mode)
            .bind(&input.dialogue)
            .bind(&input.visual_prompt)
            .bind(&input.motion_preset)
            .bind(&input.keyframe_ref)
            .bind(&input.audio_ref)
            .bind(&input.media_ref)
            .bind(&input.last_frame_ref)
            .bind(input.duration_secs)
            .fetch_optional(pool)
            .await
    }

    /// Update by id when one is known, otherwise insert.
    ///
    /// An id whose row has been deleted falls back to an insert keyed on
    /// `local_id`.
    pub async fn upsert(pool: &PgPool, input: &UpsertClip) -> Result<Clip, sqlx::Error> {
        if let Some(id) = input.id {
            if let Some(clip) = Self::update(pool, id, input).await? {
                return Ok(clip);
            }
        }
        Self::insert(pool, input).await
    }

    /// List clips newest first, optionally filtered by scene and status.
    pub async fn list(pool: &PgPool, filter: &ClipFilter) -> Result<Vec<Clip>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM clips
             WHERE ($1::TEXT IS NULL OR scene_ref = $1)
               AND ($2::TEXT IS NULL OR status = $2)
             ORDER BY created_at DESC, id DESC
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, Clip>(&query)
            .bind(&filter.scene_ref)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.limit())
            .bind(filter.offset())
            .fetch_all(pool)
            .await
    }

    /// Delete a clip. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM clips WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
