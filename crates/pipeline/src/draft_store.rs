//! The authoritative local collection of draft shots.
//!
//! Every mutation replaces the target shot wholesale, rewrites the snapshot
//! and publishes a [`StudioEvent`]. The in-memory lock is held only for the
//! mutation itself; snapshot writes are serialized separately so they land
//! in mutation order.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use storyshot_core::error::{CoreError, JobError};
use storyshot_core::shot::{
    validate_dialogue_present, validate_timing, DialogueBlock, Shot, ShotStatus, SpeakerMode,
};
use storyshot_core::types::LocalId;
use storyshot_events::bus::{
    SHOT_CREATED, SHOT_HEALED, SHOT_REMOVED, SHOT_STATUS_CHANGED, SHOT_UPDATED,
};
use storyshot_events::{EventBus, StudioEvent};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::clip_bin::BinClip;
use crate::error::StorageError;
use crate::storage::{DraftSnapshot, SnapshotStorage, SNAPSHOT_VERSION};

// ---------------------------------------------------------------------------
// Edit inputs
// ---------------------------------------------------------------------------

/// A dialogue line as submitted by an editor. Blocks with a known `id` keep
/// their recorded audio when speaker and text are unchanged.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DialogueInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub speaker_ref: String,
    pub text: String,
    #[serde(default)]
    pub pause_after_seconds: f64,
}

/// Partial update of a draft's editable fields. Absent fields are untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ShotChanges {
    pub name: Option<String>,
    pub scene_ref: Option<String>,
    pub visual_prompt: Option<String>,
    pub motion_preset: Option<String>,
    pub keyframe_ref: Option<String>,
    pub speaker_mode: Option<SpeakerMode>,
    pub convert_voice: Option<bool>,
    pub manual_duration_seconds: Option<f64>,
    pub start_delay_seconds: Option<f64>,
    pub dialogue: Option<Vec<DialogueInput>>,
}

/// Build dialogue blocks from editor input, carrying over audio from
/// unchanged lines of `previous`.
pub fn merge_dialogue(previous: &[DialogueBlock], inputs: Vec<DialogueInput>) -> Vec<DialogueBlock> {
    inputs
        .into_iter()
        .map(|input| {
            let kept = input
                .id
                .and_then(|id| previous.iter().find(|b| b.id == id))
                .filter(|b| b.speaker_ref == input.speaker_ref && b.text == input.text);
            DialogueBlock {
                id: input.id.unwrap_or_else(Uuid::new_v4),
                audio_ref: kept.and_then(|b| b.audio_ref.clone()),
                speaker_ref: input.speaker_ref,
                text: input.text,
                pause_after_seconds: input.pause_after_seconds,
                is_generating: false,
            }
        })
        .collect()
}

/// Whether two dialogue lists would synthesize to the same audio.
fn same_speech(a: &[DialogueBlock], b: &[DialogueBlock]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| {
            x.speaker_ref == y.speaker_ref
                && x.text == y.text
                && x.pause_after_seconds == y.pause_after_seconds
        })
}

impl ShotChanges {
    /// Apply the changes to `shot`. Returns `true` when rendered output is
    /// now stale.
    fn apply(self, shot: &mut Shot) -> bool {
        let mut stale = false;

        if let Some(name) = self.name {
            shot.name = name;
        }
        if let Some(scene_ref) = self.scene_ref {
            shot.scene_ref = Some(scene_ref).filter(|s| !s.trim().is_empty());
        }
        if let Some(prompt) = self.visual_prompt {
            stale |= prompt != shot.visual_prompt;
            shot.visual_prompt = prompt;
        }
        if let Some(preset) = self.motion_preset {
            let preset = Some(preset).filter(|p| !p.trim().is_empty());
            stale |= preset != shot.motion_preset;
            shot.motion_preset = preset;
        }
        if let Some(keyframe) = self.keyframe_ref {
            let keyframe = Some(keyframe).filter(|k| !k.trim().is_empty());
            stale |= keyframe != shot.keyframe_ref;
            shot.keyframe_ref = keyframe;
        }
        if let Some(mode) = self.speaker_mode {
            stale |= mode != shot.speaker_mode;
            shot.speaker_mode = mode;
        }
        if let Some(convert) = self.convert_voice {
            shot.convert_voice = convert;
        }
        if let Some(secs) = self.manual_duration_seconds {
            stale |= !shot.is_audio_locked() && secs != shot.manual_duration_seconds;
            shot.manual_duration_seconds = secs;
        }
        if let Some(secs) = self.start_delay_seconds {
            stale |= shot.is_audio_locked() && secs != shot.start_delay_seconds;
            shot.start_delay_seconds = secs;
        }
        if let Some(inputs) = self.dialogue {
            let blocks = merge_dialogue(&shot.dialogue_blocks, inputs);
            if !same_speech(&shot.dialogue_blocks, &blocks) {
                shot.unlock_audio();
                stale = true;
            }
            shot.dialogue_blocks = blocks;
        }

        stale
    }
}

// ---------------------------------------------------------------------------
// DraftStore
// ---------------------------------------------------------------------------

pub struct DraftStore {
    state: RwLock<DraftSnapshot>,
    storage: Arc<dyn SnapshotStorage>,
    bus: Arc<EventBus>,
    /// Serializes snapshot writes.
    persist: Mutex<()>,
}

impl DraftStore {
    /// Load the snapshot, heal statuses left busy by a previous run and
    /// write the healed snapshot back.
    pub async fn open(
        storage: Arc<dyn SnapshotStorage>,
        bus: Arc<EventBus>,
    ) -> Result<Self, StorageError> {
        let mut snapshot = storage.load().await?.unwrap_or_default();
        if snapshot.version != SNAPSHOT_VERSION {
            tracing::warn!(
                found = snapshot.version,
                expected = SNAPSHOT_VERSION,
                "Draft snapshot version differs, loading anyway",
            );
            snapshot.version = SNAPSHOT_VERSION;
        }

        let mut healed = Vec::new();
        for shot in &mut snapshot.shots {
            let before = shot.status;
            if shot.heal() {
                tracing::info!(
                    local_id = %shot.local_id,
                    from = %before,
                    to = %shot.status,
                    "Healed shot status after restart",
                );
                healed.push((shot.local_id, shot.remote_id, shot.status));
            }
        }

        storage.save(&snapshot).await?;
        tracing::info!(
            shots = snapshot.shots.len(),
            clips = snapshot.clips.len(),
            healed = healed.len(),
            "Draft store opened",
        );

        for (local_id, remote_id, status) in healed {
            bus.publish(
                StudioEvent::new(SHOT_HEALED)
                    .for_shot(local_id)
                    .with_remote(remote_id)
                    .with_status(status.as_str()),
            );
        }

        Ok(Self {
            state: RwLock::new(snapshot),
            storage,
            bus,
            persist: Mutex::new(()),
        })
    }

    // -- Reads --

    /// All drafts, newest first.
    pub async fn list(&self) -> Vec<Shot> {
        self.state.read().await.shots.clone()
    }

    pub async fn get(&self, local_id: LocalId) -> Option<Shot> {
        self.state
            .read()
            .await
            .shots
            .iter()
            .find(|s| s.local_id == local_id)
            .cloned()
    }

    pub async fn require(&self, local_id: LocalId) -> Result<Shot, JobError> {
        self.get(local_id).await.ok_or_else(|| not_found(local_id))
    }

    pub async fn clips(&self) -> Vec<BinClip> {
        self.state.read().await.clips.clone()
    }

    // -- Shot mutations --

    /// Add a new draft at the front of the list.
    pub async fn create(&self, shot: Shot) -> Result<Shot, JobError> {
        validate_dialogue_present(&shot.dialogue_blocks)?;
        validate_timing(&shot)?;

        let _guard = self.persist.lock().await;
        let snapshot = {
            let mut state = self.state.write().await;
            if state.shots.iter().any(|s| s.local_id == shot.local_id) {
                return Err(CoreError::Conflict(format!(
                    "Shot {} already exists",
                    shot.local_id
                ))
                .into());
            }
            state.shots.insert(0, shot.clone());
            state.clone()
        };
        self.save(&snapshot).await;

        tracing::info!(local_id = %shot.local_id, name = %shot.name, "Shot created");
        self.bus.publish(
            StudioEvent::new(SHOT_CREATED)
                .for_shot(shot.local_id)
                .with_status(shot.status.as_str()),
        );
        Ok(shot)
    }

    /// Replace a shot with the result of `f` applied to a copy.
    ///
    /// Returns `None` when the shot no longer exists, so late results for a
    /// discarded shot are dropped without effect.
    pub async fn update<F>(&self, local_id: LocalId, f: F) -> Option<Shot>
    where
        F: FnOnce(&mut Shot),
    {
        self.try_update(local_id, |shot| {
            f(shot);
            Ok(())
        })
        .await
        .ok()
    }

    /// Like [`update`](Self::update), but `f` may refuse the change. Nothing
    /// is written unless `f` succeeds.
    pub async fn try_update<F>(&self, local_id: LocalId, f: F) -> Result<Shot, JobError>
    where
        F: FnOnce(&mut Shot) -> Result<(), JobError>,
    {
        let _guard = self.persist.lock().await;
        let (before, after, snapshot) = {
            let mut state = self.state.write().await;
            let slot = state
                .shots
                .iter_mut()
                .find(|s| s.local_id == local_id)
                .ok_or_else(|| not_found(local_id))?;
            let mut next = slot.clone();
            f(&mut next)?;
            next.local_id = local_id;
            next.updated_at = Utc::now();
            let before = std::mem::replace(slot, next.clone());
            (before, next, state.clone())
        };
        self.save(&snapshot).await;
        self.publish_change(&before, &after);
        Ok(after)
    }

    /// Apply editor changes.
    ///
    /// Busy shots reject edits. Content edits on a `preview_ready` shot
    /// reopen it to `draft`, since the rendered media no longer matches.
    pub async fn update_details(
        &self,
        local_id: LocalId,
        changes: ShotChanges,
    ) -> Result<Shot, JobError> {
        self.try_update(local_id, move |shot| {
            if shot.status.is_busy() {
                return Err(CoreError::Conflict(format!(
                    "Shot is {} and cannot be edited",
                    shot.status
                ))
                .into());
            }
            let stale = changes.apply(shot);
            validate_dialogue_present(&shot.dialogue_blocks)?;
            validate_timing(shot)?;
            if stale && shot.status == ShotStatus::PreviewReady {
                shot.status = shot.status.transition(ShotStatus::Draft)?;
            }
            Ok(())
        })
        .await
    }

    /// Remove a shot. Returns the removed shot, if it existed.
    pub async fn remove(&self, local_id: LocalId) -> Option<Shot> {
        let _guard = self.persist.lock().await;
        let (removed, snapshot) = {
            let mut state = self.state.write().await;
            let index = state.shots.iter().position(|s| s.local_id == local_id)?;
            let removed = state.shots.remove(index);
            (removed, state.clone())
        };
        self.save(&snapshot).await;

        tracing::info!(%local_id, "Shot removed");
        self.bus.publish(
            StudioEvent::new(SHOT_REMOVED)
                .for_shot(local_id)
                .with_remote(removed.remote_id),
        );
        Some(removed)
    }

    // -- Bin mutations --

    /// Mutate the cached clip bin and persist it.
    pub async fn update_clips<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut Vec<BinClip>) -> T,
    {
        let _guard = self.persist.lock().await;
        let (result, snapshot) = {
            let mut state = self.state.write().await;
            let result = f(&mut state.clips);
            (result, state.clone())
        };
        self.save(&snapshot).await;
        result
    }

    pub async fn replace_clips(&self, clips: Vec<BinClip>) {
        self.update_clips(move |bin| *bin = clips).await;
    }

    // -- Internals --

    /// Write the snapshot. Failures are logged; the in-memory state stays
    /// authoritative and the next mutation retries the write.
    async fn save(&self, snapshot: &DraftSnapshot) {
        if let Err(e) = self.storage.save(snapshot).await {
            tracing::error!(error = %e, "Failed to write draft snapshot");
        }
    }

    fn publish_change(&self, before: &Shot, after: &Shot) {
        if before.status != after.status {
            tracing::info!(
                local_id = %after.local_id,
                from = %before.status,
                to = %after.status,
                "Shot status changed",
            );
            self.bus.publish(
                StudioEvent::new(SHOT_STATUS_CHANGED)
                    .for_shot(after.local_id)
                    .with_remote(after.remote_id)
                    .with_status(after.status.as_str())
                    .with_payload(serde_json::json!({
                        "from": before.status.as_str(),
                        "error": after.error_message,
                    })),
            );
        } else {
            self.bus.publish(
                StudioEvent::new(SHOT_UPDATED)
                    .for_shot(after.local_id)
                    .with_remote(after.remote_id)
                    .with_status(after.status.as_str()),
            );
        }
    }
}

fn not_found(local_id: LocalId) -> JobError {
    JobError::NotFound {
        entity: "shot",
        id: local_id.to_string(),
    }
}
