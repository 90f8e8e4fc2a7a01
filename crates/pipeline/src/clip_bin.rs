//! The clip bin: locally cached view of the remote clip collection, and the
//! merge that reconciles it with a fresh remote listing.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use storyshot_core::clip_status::ClipStatus;
use storyshot_core::shot::Shot;
use storyshot_core::timing::effective_duration_secs;
use storyshot_core::types::{DbId, LocalId, Timestamp};
use storyshot_db::models::clip::Clip;

/// Default age after which an unconfirmed local entry is dropped on merge.
pub const DEFAULT_MERGE_WINDOW_SECS: i64 = 300;

/// A clip as held in the local bin.
///
/// `id` is `None` for an optimistic entry the store has not confirmed yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinClip {
    pub id: Option<DbId>,
    pub local_id: LocalId,
    pub scene_ref: Option<String>,
    pub name: String,
    pub status: ClipStatus,
    pub audio_ref: Option<String>,
    pub media_ref: Option<String>,
    pub last_frame_ref: Option<String>,
    pub duration_secs: Option<f64>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl BinClip {
    /// Optimistic entry for a shot about to be written with `status`.
    pub fn optimistic(shot: &Shot, status: ClipStatus, now: Timestamp) -> Self {
        let media_ref = match status {
            ClipStatus::Completed => shot.rendered_media_ref.clone(),
            _ => None,
        };
        Self {
            id: shot.remote_id,
            local_id: shot.local_id,
            scene_ref: shot.scene_ref.clone(),
            name: shot.name.clone(),
            status,
            audio_ref: shot.stitched_audio_ref.clone(),
            last_frame_ref: media_ref.as_ref().and(shot.last_frame_ref.clone()),
            media_ref,
            duration_secs: Some(effective_duration_secs(shot)),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether two entries describe the same clip.
    pub fn same_clip(&self, other: &BinClip) -> bool {
        match (self.id, other.id) {
            (Some(a), Some(b)) if a == b => true,
            _ => self.local_id == other.local_id,
        }
    }
}

impl From<&Clip> for BinClip {
    fn from(clip: &Clip) -> Self {
        Self {
            id: Some(clip.id),
            local_id: clip.local_id,
            scene_ref: clip.scene_ref.clone(),
            name: clip.name.clone(),
            status: clip.clip_status(),
            audio_ref: clip.audio_ref.clone(),
            media_ref: clip.media_ref.clone(),
            last_frame_ref: clip.last_frame_ref.clone(),
            duration_secs: clip.duration_secs,
            created_at: clip.created_at,
            updated_at: clip.updated_at,
        }
    }
}

/// Insert or replace an entry in the bin, keeping its position.
///
/// A replaced entry keeps its original `created_at` unless the incoming
/// entry is store-confirmed. New entries go to the front (newest first).
pub fn upsert_entry(bin: &mut Vec<BinClip>, mut entry: BinClip) {
    match bin.iter().position(|c| c.same_clip(&entry)) {
        Some(index) => {
            if entry.id.is_none() {
                entry.id = bin[index].id;
                entry.created_at = bin[index].created_at;
            }
            bin[index] = entry;
        }
        None => bin.insert(0, entry),
    }
}

/// Merge a remote listing with the local bin.
///
/// The remote list is authoritative for every clip it contains. A local-only
/// entry survives only while it is still in flight (`pending` or `rendering`)
/// and younger than `window`; anything else has either been confirmed,
/// deleted elsewhere, or abandoned. Output is newest first.
pub fn merge(
    remote: Vec<BinClip>,
    local: &[BinClip],
    now: Timestamp,
    window: Duration,
) -> Vec<BinClip> {
    let survivors: Vec<BinClip> = local
        .iter()
        .filter(|entry| !remote.iter().any(|r| r.same_clip(entry)))
        .filter(|entry| entry.status.is_transient())
        .filter(|entry| now - entry.created_at <= window)
        .cloned()
        .collect();

    let mut merged = remote;
    merged.extend(survivors);
    merged.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    merged
}
