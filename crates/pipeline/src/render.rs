//! Video render job.
//!
//! `draft -> rendering -> preview_ready`, or back to `draft` with an error.
//! The pending clip record is written once the shot is `rendering` and
//! before the renderer is called; the final record after media is found.

use std::sync::Arc;

use storyshot_core::error::JobError;
use storyshot_core::media::MediaExtractor;
use storyshot_core::shot::{validate_timing, Shot, ShotStatus};
use storyshot_core::timing::{cap_prompt, frame_count, MAX_RENDER_PROMPT_CHARS};
use storyshot_core::types::LocalId;
use storyshot_providers::render::{DialogueMeta, RenderRequest, RendererKind};
use tokio_util::sync::CancellationToken;

use crate::draft_store::DraftStore;
use crate::ports::VideoRenderer;
use crate::reconcile::{PersistPhase, ReconciliationEngine};

/// Media produced by a successful render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutput {
    pub media_ref: String,
    pub last_frame_ref: Option<String>,
}

/// Check that a shot has what its renderer needs.
pub fn check_preconditions(shot: &Shot) -> Result<RendererKind, JobError> {
    let kind = RendererKind::for_mode(shot.speaker_mode);
    if shot.keyframe_ref.is_none() {
        return Err(JobError::Validation(
            "A keyframe image is required before rendering".to_string(),
        ));
    }
    if kind.requires_audio() && shot.stitched_audio_ref.is_none() {
        return Err(JobError::Validation(
            "Generate dialogue audio before rendering an on-screen speaker".to_string(),
        ));
    }
    validate_timing(shot)?;
    Ok(kind)
}

/// Build the renderer request for a shot.
pub fn build_request(shot: &Shot) -> RenderRequest {
    RenderRequest {
        prompt: cap_prompt(&shot.visual_prompt, MAX_RENDER_PROMPT_CHARS),
        image_ref: shot.keyframe_ref.clone(),
        audio_ref: shot.stitched_audio_ref.clone(),
        motion_preset: shot.motion_preset.clone(),
        frame_count: frame_count(shot),
        dialogue_meta: shot
            .dialogue_blocks
            .iter()
            .map(|b| DialogueMeta {
                speaker_ref: b.speaker_ref.clone(),
                text: b.text.clone(),
                pause_after_seconds: b.pause_after_seconds,
            })
            .collect(),
    }
}

pub struct RenderJob {
    renderer: Arc<dyn VideoRenderer>,
    reconciler: Arc<ReconciliationEngine>,
    drafts: Arc<DraftStore>,
}

impl RenderJob {
    pub fn new(
        renderer: Arc<dyn VideoRenderer>,
        reconciler: Arc<ReconciliationEngine>,
        drafts: Arc<DraftStore>,
    ) -> Self {
        Self {
            renderer,
            reconciler,
            drafts,
        }
    }

    pub async fn run(
        &self,
        local_id: LocalId,
        cancel: &CancellationToken,
    ) -> Result<RenderOutput, JobError> {
        let shot = self.begin(local_id).await?;
        self.execute(shot, cancel).await
    }

    /// Check preconditions and move the shot to `rendering`.
    ///
    /// A shot that is already rendering is rejected rather than queued.
    pub async fn begin(&self, local_id: LocalId) -> Result<Shot, JobError> {
        let shot = self.drafts.require(local_id).await?;
        if shot.status == ShotStatus::Rendering {
            return Err(JobError::Conflict("Shot is already rendering".to_string()));
        }
        if let Err(e) = check_preconditions(&shot) {
            let message = e.to_string();
            self.drafts
                .update(local_id, |s| s.error_message = Some(message))
                .await;
            return Err(e);
        }

        self.drafts
            .try_update(local_id, |s| {
                s.status = s.status.transition(ShotStatus::Rendering)?;
                s.error_message = None;
                Ok(())
            })
            .await
    }

    /// Render a shot already in `rendering` and settle it.
    pub async fn execute(
        &self,
        shot: Shot,
        cancel: &CancellationToken,
    ) -> Result<RenderOutput, JobError> {
        let local_id = shot.local_id;
        let kind = RendererKind::for_mode(shot.speaker_mode);
        if cancel.is_cancelled() {
            tracing::info!(%local_id, "Render cancelled before it started");
            return Err(JobError::Cancelled);
        }

        // Pending record. A failure here is not fatal: the final write
        // inserts if no id was captured.
        let shot = match self.reconciler.persist(&shot, PersistPhase::Pending).await {
            Ok(clip) => Shot {
                remote_id: Some(clip.id),
                ..shot
            },
            Err(e) => {
                tracing::warn!(%local_id, error = %e, "Pending clip write failed, rendering anyway");
                shot
            }
        };

        let request = build_request(&shot);
        tracing::info!(
            %local_id,
            remote_id = ?shot.remote_id,
            renderer = kind.as_str(),
            frame_count = request.frame_count,
            "Render started",
        );

        let result = self.render(kind, &request, cancel).await;

        match result {
            Ok(output) => {
                let media = output.clone();
                let settled = self
                    .drafts
                    .update(local_id, |s| {
                        s.status = ShotStatus::PreviewReady;
                        s.rendered_media_ref = Some(media.media_ref);
                        s.last_frame_ref = media.last_frame_ref;
                        s.error_message = None;
                    })
                    .await;

                match settled {
                    Some(settled) => {
                        tracing::info!(%local_id, media_ref = %output.media_ref, "Render finished");
                        if let Err(e) = self.reconciler.persist(&settled, PersistPhase::Final).await {
                            tracing::warn!(%local_id, error = %e, "Final clip write failed");
                        }
                    }
                    None => self.drop_discarded(&shot).await,
                }
                Ok(output)
            }
            Err(JobError::Cancelled) => {
                // Discard or shutdown. A shot that still exists keeps its
                // pending record and is healed on the next load.
                if self.drafts.get(local_id).await.is_none() {
                    self.drop_discarded(&shot).await;
                } else {
                    tracing::info!(%local_id, "Render cancelled");
                }
                Err(JobError::Cancelled)
            }
            Err(e) => {
                let message = e.to_string();
                let settled = self
                    .drafts
                    .update(local_id, |s| {
                        s.status = ShotStatus::Draft;
                        s.error_message = Some(message);
                    })
                    .await;
                match settled {
                    Some(settled) => {
                        tracing::warn!(%local_id, error = %e, "Render failed");
                        if settled.remote_id.is_some() {
                            self.reconciler.mark_failed(&settled).await;
                        }
                    }
                    None => self.drop_discarded(&shot).await,
                }
                Err(e)
            }
        }
    }

    /// The shot was discarded while rendering: drop the result and take back
    /// its pending clip.
    async fn drop_discarded(&self, shot: &Shot) {
        tracing::info!(local_id = %shot.local_id, "Shot discarded during render, dropping result");
        self.reconciler.withdraw(shot).await;
    }

    async fn render(
        &self,
        kind: RendererKind,
        request: &RenderRequest,
        cancel: &CancellationToken,
    ) -> Result<RenderOutput, JobError> {
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(JobError::Cancelled),
            result = self.renderer.render(kind, request) => result?,
        };

        let media_ref = MediaExtractor::video()
            .extract(&response)
            .ok_or(JobError::NoMediaFound("render"))?;
        let last_frame_ref = MediaExtractor::last_frame().extract(&response);
        Ok(RenderOutput {
            media_ref,
            last_frame_ref,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use storyshot_core::clip_status::ClipStatus;
    use storyshot_core::shot::{DialogueBlock, SpeakerMode};
    use storyshot_events::EventBus;

    use crate::clock::SystemClock;
    use crate::memory_store::InMemoryClipStore;
    use crate::reconcile::ReconcileSettings;
    use crate::testing::{FakeRenderer, FlakyClipStore, memory_drafts};

    struct Harness {
        drafts: Arc<DraftStore>,
        renderer: Arc<FakeRenderer>,
        store: Arc<FlakyClipStore>,
        job: RenderJob,
    }

    async fn harness() -> Harness {
        let drafts = memory_drafts().await;
        let renderer = Arc::new(FakeRenderer::new());
        let store = Arc::new(FlakyClipStore::new(InMemoryClipStore::new()));
        let reconciler = Arc::new(ReconciliationEngine::new(
            store.clone(),
            drafts.clone(),
            Arc::new(EventBus::default()),
            Arc::new(SystemClock),
            ReconcileSettings::default(),
        ));
        let job = RenderJob::new(renderer.clone(), reconciler, drafts.clone());
        Harness {
            drafts,
            renderer,
            store,
            job,
        }
    }

    fn ready_shot() -> Shot {
        let mut shot = Shot::new(
            "s",
            vec![DialogueBlock::new("charA", "Hello")],
            chrono::Utc::now(),
        );
        shot.keyframe_ref = Some("https://x/key.png".into());
        shot.stitched_audio_ref = Some("https://x/all.wav".into());
        shot.total_audio_duration_seconds = Some(3.3);
        shot.start_delay_seconds = 0.2;
        shot.visual_prompt = "a lighthouse".into();
        shot
    }

    #[tokio::test]
    async fn success_reaches_preview_ready_with_completed_clip() {
        let h = harness().await;
        h.renderer.push(Ok(json!({
            "output": { "nested": { "video_url": "https://x/clip.mp4" } },
            "last_frame_url": "https://x/last.png",
        })));
        let shot = h.drafts.create(ready_shot()).await.unwrap();

        let out = h.job.run(shot.local_id, &CancellationToken::new()).await.unwrap();
        assert_eq!(out.media_ref, "https://x/clip.mp4");
        assert_eq!(out.last_frame_ref.as_deref(), Some("https://x/last.png"));

        let after = h.drafts.get(shot.local_id).await.unwrap();
        assert_eq!(after.status, ShotStatus::PreviewReady);
        assert!(after.remote_id.is_some());

        let clip = h.store.inner().get(after.remote_id.unwrap()).await.unwrap();
        assert_eq!(clip.clip_status(), ClipStatus::Completed);
        assert_eq!(clip.media_ref.as_deref(), Some("https://x/clip.mp4"));

        let (kind, request) = h.renderer.requests().remove(0);
        assert_eq!(kind, RendererKind::LipSync);
        assert_eq!(request.frame_count, 105);
    }

    #[tokio::test]
    async fn narrator_uses_image_to_video_without_audio() {
        let h = harness().await;
        h.renderer.push(Ok(json!({ "video": "https://x/clip.webm" })));
        let mut shot = ready_shot();
        shot.speaker_mode = SpeakerMode::Narrator;
        shot.unlock_audio();
        let shot = h.drafts.create(shot).await.unwrap();

        h.job.run(shot.local_id, &CancellationToken::new()).await.unwrap();
        let (kind, request) = h.renderer.requests().remove(0);
        assert_eq!(kind, RendererKind::ImageToVideo);
        assert_eq!(request.frame_count, 150);
    }

    #[tokio::test]
    async fn missing_keyframe_is_validation_without_status_change() {
        let h = harness().await;
        let mut shot = ready_shot();
        shot.keyframe_ref = None;
        let shot = h.drafts.create(shot).await.unwrap();

        let err = h.job.run(shot.local_id, &CancellationToken::new()).await.unwrap_err();
        assert_matches!(err, JobError::Validation(_));
        let after = h.drafts.get(shot.local_id).await.unwrap();
        assert_eq!(after.status, ShotStatus::Draft);
        assert!(after.error_message.is_some());
        assert!(h.renderer.requests().is_empty());
    }

    #[tokio::test]
    async fn lip_sync_requires_audio() {
        let h = harness().await;
        let mut shot = ready_shot();
        shot.unlock_audio();
        let shot = h.drafts.create(shot).await.unwrap();

        let err = h.job.begin(shot.local_id).await.unwrap_err();
        assert_matches!(err, JobError::Validation(_));
    }

    #[tokio::test]
    async fn second_render_is_rejected() {
        let h = harness().await;
        let shot = h.drafts.create(ready_shot()).await.unwrap();

        h.job.begin(shot.local_id).await.unwrap();
        let err = h.job.begin(shot.local_id).await.unwrap_err();
        assert_matches!(err, JobError::Conflict(_));
    }

    #[tokio::test]
    async fn no_media_returns_to_draft_and_marks_clip_failed() {
        let h = harness().await;
        h.renderer.push(Ok(json!({ "status": "ok", "frames": 105 })));
        let shot = h.drafts.create(ready_shot()).await.unwrap();

        let err = h.job.run(shot.local_id, &CancellationToken::new()).await.unwrap_err();
        assert_matches!(err, JobError::NoMediaFound(_));

        let after = h.drafts.get(shot.local_id).await.unwrap();
        assert_eq!(after.status, ShotStatus::Draft);
        assert!(after.error_message.unwrap().contains("No media"));

        let clip = h.store.inner().get(after.remote_id.unwrap()).await.unwrap();
        assert_eq!(clip.clip_status(), ClipStatus::Failed);
    }

    #[tokio::test]
    async fn pending_write_failure_does_not_block_render() {
        let h = harness().await;
        h.renderer.push(Ok(json!({ "video_url": "https://x/clip.mp4" })));
        h.store.fail_writes(true);
        let shot = h.drafts.create(ready_shot()).await.unwrap();

        let out = h.job.run(shot.local_id, &CancellationToken::new()).await;
        assert!(out.is_ok());
        let after = h.drafts.get(shot.local_id).await.unwrap();
        assert_eq!(after.status, ShotStatus::PreviewReady);
        assert!(after.remote_id.is_none());
    }

    #[tokio::test]
    async fn cancelled_render_writes_no_clip() {
        let h = harness().await;
        let shot = h.drafts.create(ready_shot()).await.unwrap();
        let started = h.job.begin(shot.local_id).await.unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = h.job.execute(started, &cancel).await.unwrap_err();
        assert_matches!(err, JobError::Cancelled);
        assert!(h.renderer.requests().is_empty());
        assert!(h.store.inner().is_empty().await);
        assert!(h.drafts.clips().await.is_empty());
    }

    #[tokio::test]
    async fn failure_after_discard_leaves_no_clip() {
        let h = harness().await;
        h.renderer.push(Ok(json!({ "status": "ok" })));
        let shot = h.drafts.create(ready_shot()).await.unwrap();
        let started = h.job.begin(shot.local_id).await.unwrap();
        let pending = h.job.reconciler.persist(&started, PersistPhase::Pending).await.unwrap();
        h.drafts.remove(shot.local_id).await.unwrap();

        let discarded = Shot {
            remote_id: Some(pending.id),
            ..started
        };
        let err = h.job.execute(discarded, &CancellationToken::new()).await.unwrap_err();
        assert_matches!(err, JobError::NoMediaFound(_));
        assert!(h.store.inner().is_empty().await);
        assert!(h.drafts.clips().await.is_empty());
    }

    #[test]
    fn long_prompt_is_capped() {
        let mut shot = ready_shot();
        shot.visual_prompt = "ä".repeat(MAX_RENDER_PROMPT_CHARS + 50);
        let request = build_request(&shot);
        assert_eq!(request.prompt.chars().count(), MAX_RENDER_PROMPT_CHARS);
    }
}
