//! In-memory [`ClipStore`], used when no database is configured.
//!
//! Mirrors the PostgreSQL repository's upsert and ordering semantics so the
//! engine behaves the same against either backend.

use std::sync::Arc;

use async_trait::async_trait;
use storyshot_core::types::DbId;
use storyshot_db::models::clip::{Clip, ClipFilter, UpsertClip};
use tokio::sync::RwLock;

use crate::clock::{Clock, SystemClock};
use crate::error::StoreError;
use crate::ports::ClipStore;

struct Rows {
    next_id: DbId,
    clips: Vec<Clip>,
}

pub struct InMemoryClipStore {
    rows: RwLock<Rows>,
    clock: Arc<dyn Clock>,
}

impl InMemoryClipStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            rows: RwLock::new(Rows {
                next_id: 1,
                clips: Vec::new(),
            }),
            clock,
        }
    }

    /// Number of stored clips.
    pub async fn len(&self) -> usize {
        self.rows.read().await.clips.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn get(&self, id: DbId) -> Option<Clip> {
        self.rows
            .read()
            .await
            .clips
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }
}

impl Default for InMemoryClipStore {
    fn default() -> Self {
        Self::new()
    }
}

fn apply(clip: &mut Clip, input: &UpsertClip, now: storyshot_core::types::Timestamp) {
    clip.scene_ref = input.scene_ref.clone();
    clip.name = input.name.clone();
    clip.status = input.status.as_str().to_string();
    clip.speaker_mode = input.speaker_mode.clone();
    clip.dialogue = input.dialogue.clone();
    clip.visual_prompt = input.visual_prompt.clone();
    clip.motion_preset = input.motion_preset.clone();
    clip.keyframe_ref = input.keyframe_ref.clone();
    clip.audio_ref = input.audio_ref.clone();
    clip.media_ref = input.media_ref.clone();
    clip.last_frame_ref = input.last_frame_ref.clone();
    clip.duration_secs = input.duration_secs;
    clip.updated_at = now;
}

#[async_trait]
impl ClipStore for InMemoryClipStore {
    async fn upsert(&self, input: &UpsertClip) -> Result<Clip, StoreError> {
        let now = self.clock.now();
        let mut rows = self.rows.write().await;

        // Update by id first, then by local_id, matching the SQL upsert.
        let existing = input
            .id
            .and_then(|id| rows.clips.iter().position(|c| c.id == id))
            .or_else(|| rows.clips.iter().position(|c| c.local_id == input.local_id));

        if let Some(index) = existing {
            let clip = &mut rows.clips[index];
            apply(clip, input, now);
            return Ok(clip.clone());
        }

        let id = rows.next_id;
        rows.next_id += 1;
        let mut clip = Clip {
            id,
            local_id: input.local_id,
            scene_ref: None,
            name: String::new(),
            status: String::new(),
            speaker_mode: String::new(),
            dialogue: serde_json::Value::Null,
            visual_prompt: String::new(),
            motion_preset: None,
            keyframe_ref: None,
            audio_ref: None,
            media_ref: None,
            last_frame_ref: None,
            duration_secs: None,
            created_at: now,
            updated_at: now,
        };
        apply(&mut clip, input, now);
        rows.clips.push(clip.clone());
        Ok(clip)
    }

    async fn list(&self, filter: &ClipFilter) -> Result<Vec<Clip>, StoreError> {
        let rows = self.rows.read().await;
        let mut clips: Vec<Clip> = rows
            .clips
            .iter()
            .filter(|c| {
                filter
                    .scene_ref
                    .as_ref()
                    .map_or(true, |scene| c.scene_ref.as_ref() == Some(scene))
            })
            .filter(|c| filter.status.map_or(true, |s| c.status == s.as_str()))
            .cloned()
            .collect();
        clips.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(clips
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.limit() as usize)
            .collect())
    }

    async fn delete(&self, id: DbId) -> Result<bool, StoreError> {
        let mut rows = self.rows.write().await;
        let before = rows.clips.len();
        rows.clips.retain(|c| c.id != id);
        Ok(rows.clips.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storyshot_core::clip_status::ClipStatus;

    fn input(local_id: uuid::Uuid, status: ClipStatus) -> UpsertClip {
        UpsertClip {
            id: None,
            local_id,
            scene_ref: Some("scene-1".into()),
            name: "Opening".into(),
            status,
            speaker_mode: "on_screen".into(),
            dialogue: serde_json::json!([]),
            visual_prompt: "sea".into(),
            motion_preset: None,
            keyframe_ref: None,
            audio_ref: None,
            media_ref: None,
            last_frame_ref: None,
            duration_secs: Some(3.5),
        }
    }

    #[tokio::test]
    async fn retried_insert_updates_same_row() {
        let store = InMemoryClipStore::new();
        let local_id = uuid::Uuid::new_v4();

        let first = store.upsert(&input(local_id, ClipStatus::Rendering)).await.unwrap();
        let second = store.upsert(&input(local_id, ClipStatus::Completed)).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.len().await, 1);
        assert_eq!(second.clip_status(), ClipStatus::Completed);
    }

    #[tokio::test]
    async fn deleted_id_falls_back_to_insert() {
        let store = InMemoryClipStore::new();
        let local_id = uuid::Uuid::new_v4();
        let first = store.upsert(&input(local_id, ClipStatus::Rendering)).await.unwrap();
        assert!(store.delete(first.id).await.unwrap());

        let mut again = input(local_id, ClipStatus::Completed);
        again.id = Some(first.id);
        let second = store.upsert(&again).await.unwrap();
        assert_ne!(second.id, first.id);
        assert!(!store.delete(first.id).await.unwrap());
    }

    #[tokio::test]
    async fn list_filters_by_status_newest_first() {
        let store = InMemoryClipStore::new();
        let a = store
            .upsert(&input(uuid::Uuid::new_v4(), ClipStatus::Completed))
            .await
            .unwrap();
        store
            .upsert(&input(uuid::Uuid::new_v4(), ClipStatus::Rendering))
            .await
            .unwrap();
        let c = store
            .upsert(&input(uuid::Uuid::new_v4(), ClipStatus::Completed))
            .await
            .unwrap();

        let filter = ClipFilter {
            status: Some(ClipStatus::Completed),
            ..Default::default()
        };
        let ids: Vec<_> = store.list(&filter).await.unwrap().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![c.id, a.id]);
    }
}
