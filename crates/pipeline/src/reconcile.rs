//! Reconciliation between the local draft/bin state and the remote clip
//! store.
//!
//! Shots are persisted in two phases. The pending write records the render
//! before it starts so an interrupted render can be recovered by id; the
//! final write stores the media. Both are upserts keyed by the remote id once
//! one exists, so retries never duplicate a clip.

use std::sync::Arc;

use storyshot_core::clip_status::ClipStatus;
use storyshot_core::error::JobError;
use storyshot_core::shot::Shot;
use storyshot_core::timing::effective_duration_secs;
use storyshot_core::types::DbId;
use storyshot_db::models::clip::{Clip, ClipFilter, UpsertClip};
use storyshot_events::bus::{CLIPS_REFRESHED, CLIP_REMOVED, CLIP_UPSERTED};
use storyshot_events::{EventBus, StudioEvent};

use crate::clip_bin::{merge, upsert_entry, BinClip};
use crate::clock::Clock;
use crate::draft_store::DraftStore;
use crate::ports::ClipStore;

/// Which half of the two-phase write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistPhase {
    /// Render started; no media yet.
    Pending,
    /// Render finished; media attached.
    Final,
}

impl PersistPhase {
    pub fn clip_status(self) -> ClipStatus {
        match self {
            Self::Pending => ClipStatus::Rendering,
            Self::Final => ClipStatus::Completed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReconcileSettings {
    /// How long an unconfirmed local bin entry survives a refresh.
    pub merge_window: chrono::Duration,
    /// Page size for remote listings.
    pub list_limit: i64,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            merge_window: chrono::Duration::seconds(crate::clip_bin::DEFAULT_MERGE_WINDOW_SECS),
            list_limit: storyshot_db::models::clip::DEFAULT_CLIP_LIMIT,
        }
    }
}

/// Build the store input for a shot at a given status.
pub fn upsert_input(shot: &Shot, status: ClipStatus) -> UpsertClip {
    let completed = status == ClipStatus::Completed;
    UpsertClip {
        id: shot.remote_id,
        local_id: shot.local_id,
        scene_ref: shot.scene_ref.clone(),
        name: shot.name.clone(),
        status,
        speaker_mode: shot.speaker_mode.as_str().to_string(),
        dialogue: serde_json::to_value(&shot.dialogue_blocks).unwrap_or_default(),
        visual_prompt: shot.visual_prompt.clone(),
        motion_preset: shot.motion_preset.clone(),
        keyframe_ref: shot.keyframe_ref.clone(),
        audio_ref: shot.stitched_audio_ref.clone(),
        media_ref: shot.rendered_media_ref.clone().filter(|_| completed),
        last_frame_ref: shot.last_frame_ref.clone().filter(|_| completed),
        duration_secs: Some(effective_duration_secs(shot)),
    }
}

pub struct ReconciliationEngine {
    store: Arc<dyn ClipStore>,
    drafts: Arc<DraftStore>,
    bus: Arc<EventBus>,
    clock: Arc<dyn Clock>,
    settings: ReconcileSettings,
}

impl ReconciliationEngine {
    pub fn new(
        store: Arc<dyn ClipStore>,
        drafts: Arc<DraftStore>,
        bus: Arc<EventBus>,
        clock: Arc<dyn Clock>,
        settings: ReconcileSettings,
    ) -> Self {
        Self {
            store,
            drafts,
            bus,
            clock,
            settings,
        }
    }

    /// Write one phase of a shot to the remote store.
    pub async fn persist(&self, shot: &Shot, phase: PersistPhase) -> Result<Clip, JobError> {
        self.write(shot, phase.clip_status()).await
    }

    /// Best-effort mark of a failed render. Errors are logged only.
    pub async fn mark_failed(&self, shot: &Shot) {
        if let Err(e) = self.write(shot, ClipStatus::Failed).await {
            tracing::warn!(
                local_id = %shot.local_id,
                remote_id = ?shot.remote_id,
                error = %e,
                "Could not mark clip as failed",
            );
        }
    }

    /// Remove the clip of a shot discarded mid-render from the bin and the
    /// store. Store errors are logged only.
    pub async fn withdraw(&self, shot: &Shot) {
        let local_id = shot.local_id;
        let removed = self
            .drafts
            .update_clips(|bin| {
                let before = bin.len();
                bin.retain(|c| {
                    c.local_id != local_id && (shot.remote_id.is_none() || c.id != shot.remote_id)
                });
                before - bin.len()
            })
            .await;

        if let Some(id) = shot.remote_id {
            match self.store.delete(id).await {
                Ok(_) => self.bus.publish(
                    StudioEvent::new(CLIP_REMOVED)
                        .for_shot(local_id)
                        .with_remote(Some(id)),
                ),
                Err(e) => {
                    tracing::warn!(%local_id, remote_id = id, error = %e, "Could not withdraw clip");
                }
            }
        }
        tracing::info!(%local_id, remote_id = ?shot.remote_id, removed, "Clip withdrawn");
    }

    async fn write(&self, shot: &Shot, status: ClipStatus) -> Result<Clip, JobError> {
        let local_id = shot.local_id;
        let now = self.clock.now();

        // Optimistic bin entry first, so the bin reflects the write at once.
        self.drafts
            .update_clips(|bin| upsert_entry(bin, BinClip::optimistic(shot, status, now)))
            .await;

        let input = upsert_input(shot, status);
        let clip = match self.store.upsert(&input).await {
            Ok(clip) => clip,
            Err(e) => {
                tracing::error!(
                    %local_id,
                    remote_id = ?shot.remote_id,
                    status = status.as_str(),
                    error = %e,
                    "Clip upsert failed",
                );
                return Err(e.into());
            }
        };

        // The store's answer replaces the optimistic entry.
        let confirmed = BinClip::from(&clip);
        self.drafts
            .update_clips(|bin| upsert_entry(bin, confirmed))
            .await;

        if shot.remote_id != Some(clip.id) {
            let remote_id = clip.id;
            self.drafts
                .update(local_id, |s| s.remote_id = Some(remote_id))
                .await;
        }

        tracing::info!(
            %local_id,
            remote_id = clip.id,
            status = status.as_str(),
            "Clip persisted",
        );
        self.bus.publish(
            StudioEvent::new(CLIP_UPSERTED)
                .for_shot(local_id)
                .with_remote(Some(clip.id))
                .with_status(status.as_str()),
        );
        Ok(clip)
    }

    /// Fetch the remote listing and merge it into the cached bin.
    pub async fn refresh(&self) -> Result<Vec<BinClip>, JobError> {
        let filter = ClipFilter {
            limit: Some(self.settings.list_limit),
            ..Default::default()
        };
        let remote: Vec<BinClip> = self
            .store
            .list(&filter)
            .await?
            .iter()
            .map(BinClip::from)
            .collect();

        let now = self.clock.now();
        let window = self.settings.merge_window;
        let merged = self
            .drafts
            .update_clips(|bin| {
                *bin = merge(remote, bin, now, window);
                bin.clone()
            })
            .await;

        tracing::debug!(clips = merged.len(), "Clip bin refreshed");
        self.bus.publish(
            StudioEvent::new(CLIPS_REFRESHED)
                .with_payload(serde_json::json!({ "count": merged.len() })),
        );
        Ok(merged)
    }

    /// Delete a clip, removing it from the bin first.
    ///
    /// If the store rejects the delete the entry is put back where it was.
    pub async fn delete_clip(&self, id: DbId) -> Result<(), JobError> {
        let removed = self
            .drafts
            .update_clips(|bin| {
                let index = bin.iter().position(|c| c.id == Some(id))?;
                Some((index, bin.remove(index)))
            })
            .await;

        match self.store.delete(id).await {
            Ok(existed) => {
                tracing::info!(remote_id = id, existed, "Clip deleted");
                self.bus.publish(StudioEvent::new(CLIP_REMOVED).with_remote(Some(id)));
                Ok(())
            }
            Err(e) => {
                tracing::error!(remote_id = id, error = %e, "Clip delete failed, restoring");
                if let Some((index, entry)) = removed {
                    self.drafts
                        .update_clips(|bin| {
                            let index = index.min(bin.len());
                            bin.insert(index, entry);
                        })
                        .await;
                }
                Err(e.into())
            }
        }
    }
}
