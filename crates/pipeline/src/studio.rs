//! User-level operations over the engine.
//!
//! [`Studio`] owns the draft store, job registry and jobs. Long-running work
//! (synthesis, rendering, conversion of captured audio) is validated and
//! started synchronously, then finished on a detached task so callers get the
//! shot's new status immediately. Completions for a discarded shot are
//! dropped.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use storyshot_core::error::JobError;
use storyshot_core::shot::{DialogueBlock, Shot, ShotStatus, SpeakerMode};
use storyshot_core::timing::DEFAULT_MANUAL_DURATION_SECS;
use storyshot_core::types::{DbId, LocalId};
use storyshot_core::voice::VoiceLibrary;
use storyshot_events::EventBus;
use tokio::sync::{Mutex, RwLock};
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use crate::clip_bin::BinClip;
use crate::clock::Clock;
use crate::conversion::{ConversionJob, ConversionSettings};
use crate::draft_store::{merge_dialogue, DialogueInput, DraftStore, ShotChanges};
use crate::error::StorageError;
use crate::ports::{
    AudioCapture, CapturedAudio, ClipStore, SpeechSynthesizer, VideoRenderer, VoiceConverter,
};
use crate::reconcile::{PersistPhase, ReconcileSettings, ReconciliationEngine};
use crate::registry::{JobKind, JobRegistry, JobTicket};
use crate::render::RenderJob;
use crate::storage::SnapshotStorage;
use crate::synthesis::SynthesisJob;

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

/// External collaborators the studio is built from.
pub struct StudioDeps {
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub converter: Arc<dyn VoiceConverter>,
    pub renderer: Arc<dyn VideoRenderer>,
    pub store: Arc<dyn ClipStore>,
    pub storage: Arc<dyn SnapshotStorage>,
    pub capture: Option<Arc<dyn AudioCapture>>,
    pub bus: Arc<EventBus>,
    pub clock: Arc<dyn Clock>,
}

#[derive(Debug, Clone, Default)]
pub struct StudioConfig {
    pub conversion: ConversionSettings,
    pub reconcile: ReconcileSettings,
}

/// Input for a new draft.
#[derive(Debug, Clone, Deserialize)]
pub struct NewShot {
    pub name: String,
    #[serde(default)]
    pub scene_ref: Option<String>,
    pub dialogue: Vec<DialogueInput>,
    #[serde(default)]
    pub visual_prompt: String,
    #[serde(default)]
    pub motion_preset: Option<String>,
    #[serde(default)]
    pub keyframe_ref: Option<String>,
    #[serde(default)]
    pub speaker_mode: SpeakerMode,
    #[serde(default)]
    pub convert_voice: bool,
    #[serde(default)]
    pub manual_duration_seconds: Option<f64>,
    #[serde(default)]
    pub start_delay_seconds: f64,
}

impl NewShot {
    fn into_shot(self) -> Shot {
        let mut shot = Shot::new(self.name, merge_dialogue(&[], self.dialogue), Utc::now());
        shot.scene_ref = self.scene_ref.filter(|s| !s.trim().is_empty());
        shot.visual_prompt = self.visual_prompt;
        shot.motion_preset = self.motion_preset.filter(|s| !s.trim().is_empty());
        shot.keyframe_ref = self.keyframe_ref.filter(|s| !s.trim().is_empty());
        shot.speaker_mode = self.speaker_mode;
        shot.convert_voice = self.convert_voice;
        shot.manual_duration_seconds = self
            .manual_duration_seconds
            .unwrap_or(DEFAULT_MANUAL_DURATION_SECS);
        shot.start_delay_seconds = self.start_delay_seconds;
        shot
    }
}

/// A capture in progress for one dialogue block.
struct ActiveCapture {
    block_id: Uuid,
    _ticket: JobTicket,
}

pub struct Studio {
    drafts: Arc<DraftStore>,
    registry: Arc<JobRegistry>,
    voices: Arc<RwLock<VoiceLibrary>>,
    synthesis: Arc<SynthesisJob>,
    conversion: Arc<ConversionJob>,
    render: Arc<RenderJob>,
    reconciler: Arc<ReconciliationEngine>,
    capture: Option<Arc<dyn AudioCapture>>,
    captures: Mutex<HashMap<LocalId, ActiveCapture>>,
    tasks: TaskTracker,
}

impl Studio {
    /// Open the draft store and wire up the jobs.
    pub async fn open(deps: StudioDeps, config: StudioConfig) -> Result<Arc<Self>, StorageError> {
        let drafts = Arc::new(DraftStore::open(deps.storage, deps.bus.clone()).await?);
        let voices = Arc::new(RwLock::new(VoiceLibrary::default()));
        let conversion = Arc::new(ConversionJob::new(deps.converter, config.conversion));
        let reconciler = Arc::new(ReconciliationEngine::new(
            deps.store,
            drafts.clone(),
            deps.bus,
            deps.clock,
            config.reconcile,
        ));
        let synthesis = Arc::new(SynthesisJob::new(
            deps.synthesizer,
            conversion.clone(),
            drafts.clone(),
            voices.clone(),
        ));
        let render = Arc::new(RenderJob::new(
            deps.renderer,
            reconciler.clone(),
            drafts.clone(),
        ));

        Ok(Arc::new(Self {
            drafts,
            registry: JobRegistry::new(),
            voices,
            synthesis,
            conversion,
            render,
            reconciler,
            capture: deps.capture,
            captures: Mutex::new(HashMap::new()),
            tasks: TaskTracker::new(),
        }))
    }

    // -- Drafts --

    pub async fn create_shot(&self, input: NewShot) -> Result<Shot, JobError> {
        self.drafts.create(input.into_shot()).await
    }

    pub async fn update_shot(
        &self,
        local_id: LocalId,
        changes: ShotChanges,
    ) -> Result<Shot, JobError> {
        self.drafts.update_details(local_id, changes).await
    }

    /// Drop a draft and cancel everything running for it.
    pub async fn discard_shot(&self, local_id: LocalId) -> Result<Shot, JobError> {
        self.registry.cancel_all(local_id);
        let active = self.captures.lock().await.remove(&local_id);
        if let (Some(active), Some(device)) = (active, &self.capture) {
            match device.stop().await {
                Ok(_) => {
                    tracing::info!(%local_id, block_id = %active.block_id, "Capture dropped with shot")
                }
                Err(e) => {
                    tracing::warn!(%local_id, error = %e, "Could not stop capture for discarded shot")
                }
            }
        }
        self.drafts.remove(local_id).await.ok_or(JobError::NotFound {
            entity: "shot",
            id: local_id.to_string(),
        })
    }

    pub async fn list_shots(&self) -> Vec<Shot> {
        self.drafts.list().await
    }

    pub async fn get_shot(&self, local_id: LocalId) -> Result<Shot, JobError> {
        self.drafts.require(local_id).await
    }

    // -- Generation --

    /// Start dialogue synthesis. Returns the shot in `generating`.
    pub async fn generate_audio(self: &Arc<Self>, local_id: LocalId) -> Result<Shot, JobError> {
        let ticket = self.registry.begin(local_id, JobKind::Synthesis)?;
        let shot = self.synthesis.begin(local_id).await?;
        let started = shot.clone();

        let studio = Arc::clone(self);
        self.tasks.spawn(async move {
            let _ = studio.synthesis.execute(shot, ticket.token()).await;
        });
        Ok(started)
    }

    /// Start a render. Returns the shot in `rendering`.
    pub async fn render(self: &Arc<Self>, local_id: LocalId) -> Result<Shot, JobError> {
        let ticket = self.registry.begin(local_id, JobKind::Render)?;
        let shot = self.render.begin(local_id).await?;
        let started = shot.clone();

        let studio = Arc::clone(self);
        self.tasks.spawn(async move {
            let _ = studio.render.execute(shot, ticket.token()).await;
        });
        Ok(started)
    }

    /// Synthesize, then render, as one detached sequence.
    pub async fn produce(self: &Arc<Self>, local_id: LocalId) -> Result<Shot, JobError> {
        let synth_ticket = self.registry.begin(local_id, JobKind::Synthesis)?;
        let render_ticket = self.registry.begin(local_id, JobKind::Render)?;
        let shot = self.synthesis.begin(local_id).await?;
        let started = shot.clone();

        let studio = Arc::clone(self);
        self.tasks.spawn(async move {
            let synthesized = studio.synthesis.execute(shot, synth_ticket.token()).await;
            drop(synth_ticket);
            if synthesized.is_err() {
                return;
            }
            let _ = studio.render.run(local_id, render_ticket.token()).await;
        });
        Ok(started)
    }

    // -- Bin --

    /// Promote a previewed draft into the bin and drop it from drafts.
    pub async fn save_to_bin(&self, local_id: LocalId) -> Result<BinClip, JobError> {
        let shot = self.drafts.require(local_id).await?;
        if shot.status != ShotStatus::PreviewReady {
            return Err(JobError::Conflict(format!(
                "Only a previewed shot can be saved, this one is {}",
                shot.status
            )));
        }

        let clip = self.reconciler.persist(&shot, PersistPhase::Final).await?;
        self.drafts.remove(local_id).await;
        tracing::info!(%local_id, remote_id = clip.id, "Shot saved to bin");
        Ok(BinClip::from(&clip))
    }

    pub async fn list_clips(&self) -> Vec<BinClip> {
        self.drafts.clips().await
    }

    pub async fn refresh_clips(&self) -> Result<Vec<BinClip>, JobError> {
        self.reconciler.refresh().await
    }

    pub async fn delete_clip(&self, id: DbId) -> Result<(), JobError> {
        self.reconciler.delete_clip(id).await
    }

    // -- Voices --

    pub async fn set_voice_library(&self, library: VoiceLibrary) {
        tracing::info!(
            characters = library.characters.len(),
            voices = library.voices.len(),
            "Voice library updated",
        );
        *self.voices.write().await = library;
    }

    pub async fn voice_library(&self) -> VoiceLibrary {
        self.voices.read().await.clone()
    }

    // -- Capture and re-voicing --

    /// Start recording a take for one dialogue block.
    pub async fn start_capture(&self, local_id: LocalId, block_id: Uuid) -> Result<(), JobError> {
        let device = self
            .capture
            .as_ref()
            .ok_or_else(|| JobError::Validation("No capture device is available".to_string()))?;
        let shot = self.drafts.require(local_id).await?;
        find_block(&shot, block_id)?;

        let ticket = self.registry.begin(local_id, JobKind::Capture)?;
        device.start().await?;
        self.captures.lock().await.insert(
            local_id,
            ActiveCapture {
                block_id,
                _ticket: ticket,
            },
        );
        tracing::info!(%local_id, %block_id, "Capture started");
        Ok(())
    }

    /// Stop recording and convert the take towards the block's voice.
    pub async fn stop_capture(self: &Arc<Self>, local_id: LocalId) -> Result<Shot, JobError> {
        let device = self
            .capture
            .as_ref()
            .ok_or_else(|| JobError::Validation("No capture device is available".to_string()))?;
        let active = self
            .captures
            .lock()
            .await
            .remove(&local_id)
            .ok_or_else(|| JobError::Validation("No capture in progress for shot".to_string()))?;

        let captured = device.stop().await?;
        tracing::info!(%local_id, block_id = %active.block_id, bytes = captured.bytes.len(), "Capture stopped");
        self.revoice_block(local_id, active.block_id, captured).await
    }

    /// Convert supplied audio towards the voice of a dialogue block and
    /// store it on the block. Runs detached; the block is flagged as
    /// generating meanwhile.
    ///
    /// Without a conversion target the take is stored as recorded. If the
    /// conversion fails the raw take is kept and the error recorded on the
    /// shot.
    pub async fn revoice_block(
        self: &Arc<Self>,
        local_id: LocalId,
        block_id: Uuid,
        audio: CapturedAudio,
    ) -> Result<Shot, JobError> {
        let shot = self.drafts.require(local_id).await?;
        let block = find_block(&shot, block_id)?;
        let target = {
            let voices = self.voices.read().await;
            voices.conversion_target(&voices.resolve(&block.speaker_ref))
        };
        let raw = audio.clone().into_input().to_wire();

        let Some(target) = target else {
            tracing::warn!(%local_id, %block_id, "No conversion target, storing raw take");
            return self
                .drafts
                .try_update(local_id, |s| set_block(s, block_id, |b| b.audio_ref = Some(raw)))
                .await;
        };

        let ticket = self.registry.begin(local_id, JobKind::Conversion)?;
        let flagged = self
            .drafts
            .try_update(local_id, |s| set_block(s, block_id, |b| b.is_generating = true))
            .await?;

        let studio = Arc::clone(self);
        self.tasks.spawn(async move {
            let result = studio
                .conversion
                .run_captured(audio, &target, ticket.token())
                .await;
            if matches!(result, Err(JobError::Cancelled)) {
                return;
            }
            let stored = studio
                .drafts
                .try_update(local_id, |s| {
                    let converted = match &result {
                        Ok(converted) => converted.clone(),
                        Err(e) => {
                            s.error_message = Some(e.to_string());
                            raw
                        }
                    };
                    set_block(s, block_id, |b| {
                        b.audio_ref = Some(converted);
                        b.is_generating = false;
                    })
                })
                .await;
            match (stored, result) {
                (Ok(_), Ok(_)) => tracing::info!(%local_id, %block_id, "Block re-voiced"),
                (Ok(_), Err(e)) => {
                    tracing::warn!(%local_id, %block_id, error = %e, "Re-voicing failed, kept raw take")
                }
                (Err(JobError::NotFound { entity: "dialogue block", .. }), _) => {
                    tracing::warn!(%local_id, %block_id, "Block removed before its take was stored");
                    let message =
                        format!("Dialogue line {block_id} was removed before its take was stored");
                    studio
                        .drafts
                        .update(local_id, |s| s.error_message = Some(message))
                        .await;
                }
                (Err(_), _) => tracing::info!(%local_id, "Shot discarded during re-voicing"),
            }
        });
        Ok(flagged)
    }

    // -- Lifecycle --

    /// Cancel running jobs and wait for detached tasks to finish.
    pub async fn shutdown(&self) {
        self.registry.shutdown();
        self.tasks.close();
        self.tasks.wait().await;
        tracing::info!("Studio stopped");
    }

    /// Wait until every detached task spawned so far has finished.
    pub async fn wait_idle(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }
}

fn find_block(shot: &Shot, block_id: Uuid) -> Result<&DialogueBlock, JobError> {
    shot.dialogue_blocks
        .iter()
        .find(|b| b.id == block_id)
        .ok_or_else(|| JobError::NotFound {
            entity: "dialogue block",
            id: block_id.to_string(),
        })
}

fn set_block<F>(shot: &mut Shot, block_id: Uuid, f: F) -> Result<(), JobError>
where
    F: FnOnce(&mut DialogueBlock),
{
    let block = shot
        .dialogue_blocks
        .iter_mut()
        .find(|b| b.id == block_id)
        .ok_or_else(|| JobError::NotFound {
            entity: "dialogue block",
            id: block_id.to_string(),
        })?;
    f(block);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use storyshot_core::clip_status::ClipStatus;
    use storyshot_core::voice::Character;

    use crate::clock::SystemClock;
    use crate::memory_store::InMemoryClipStore;
    use crate::storage::MemorySnapshotStorage;
    use crate::testing::{FakeCapture, FakeConverter, FakeRenderer, FakeSynthesizer};

    struct Harness {
        studio: Arc<Studio>,
        synth: Arc<FakeSynthesizer>,
        converter: Arc<FakeConverter>,
        renderer: Arc<FakeRenderer>,
        store: Arc<InMemoryClipStore>,
        capture: Arc<FakeCapture>,
    }

    async fn harness_with(renderer: FakeRenderer) -> Harness {
        let synth = Arc::new(FakeSynthesizer::new());
        let converter = Arc::new(FakeConverter::new());
        let renderer = Arc::new(renderer);
        let store = Arc::new(InMemoryClipStore::new());
        let capture = Arc::new(FakeCapture::new());
        let config = StudioConfig {
            conversion: ConversionSettings {
                poll_interval: std::time::Duration::from_millis(5),
                ..ConversionSettings::default()
            },
            ..StudioConfig::default()
        };
        let studio = Studio::open(
            StudioDeps {
                synthesizer: synth.clone(),
                converter: converter.clone(),
                renderer: renderer.clone(),
                store: store.clone(),
                storage: Arc::new(MemorySnapshotStorage::new()),
                capture: Some(capture.clone()),
                bus: Arc::new(EventBus::default()),
                clock: Arc::new(SystemClock),
            },
            config,
        )
        .await
        .unwrap();
        studio
            .set_voice_library(VoiceLibrary {
                characters: vec![Character {
                    id: "charA".into(),
                    name: "A".into(),
                    voice_id: Some("cloned".into()),
                    voice_ref_url: Some("https://x/a.wav".into()),
                }],
                voices: vec![],
            })
            .await;
        Harness {
            studio,
            synth,
            converter,
            renderer,
            store,
            capture,
        }
    }

    async fn harness() -> Harness {
        harness_with(FakeRenderer::new()).await
    }

    fn new_shot() -> NewShot {
        NewShot {
            name: "Opening".into(),
            scene_ref: None,
            dialogue: vec![DialogueInput {
                id: None,
                speaker_ref: "charA".into(),
                text: "Hello".into(),
                pause_after_seconds: 0.0,
            }],
            visual_prompt: "a lighthouse".into(),
            motion_preset: None,
            keyframe_ref: Some("https://x/key.png".into()),
            speaker_mode: SpeakerMode::OnScreen,
            convert_voice: false,
            manual_duration_seconds: None,
            start_delay_seconds: 0.0,
        }
    }

    #[tokio::test]
    async fn produce_runs_synthesis_then_render() {
        let h = harness().await;
        let shot = h.studio.create_shot(new_shot()).await.unwrap();

        let started = h.studio.produce(shot.local_id).await.unwrap();
        assert_eq!(started.status, ShotStatus::Generating);

        h.studio.wait_idle().await;
        let done = h.studio.get_shot(shot.local_id).await.unwrap();
        assert_eq!(done.status, ShotStatus::PreviewReady);
        assert_eq!(done.rendered_media_ref.as_deref(), Some("https://fake/render.mp4"));
        assert_eq!(h.synth.requests().len(), 1);
        assert_eq!(h.renderer.requests().len(), 1);
    }

    #[tokio::test]
    async fn render_while_rendering_is_rejected() {
        let h = harness_with(FakeRenderer::gated()).await;
        let mut input = new_shot();
        input.speaker_mode = SpeakerMode::Narrator;
        let shot = h.studio.create_shot(input).await.unwrap();

        let started = h.studio.render(shot.local_id).await.unwrap();
        assert_eq!(started.status, ShotStatus::Rendering);
        assert_matches!(h.studio.render(shot.local_id).await, Err(JobError::Conflict(_)));

        h.renderer.release();
        h.studio.wait_idle().await;
        assert_eq!(
            h.studio.get_shot(shot.local_id).await.unwrap().status,
            ShotStatus::PreviewReady
        );
    }

    #[tokio::test]
    async fn discard_during_render_drops_result() {
        let h = harness_with(FakeRenderer::gated()).await;
        let mut input = new_shot();
        input.speaker_mode = SpeakerMode::Narrator;
        let shot = h.studio.create_shot(input).await.unwrap();

        h.studio.render(shot.local_id).await.unwrap();
        h.studio.discard_shot(shot.local_id).await.unwrap();
        h.studio.wait_idle().await;

        assert_matches!(
            h.studio.get_shot(shot.local_id).await,
            Err(JobError::NotFound { .. })
        );
        assert!(h.studio.list_shots().await.is_empty());
        assert!(h
            .studio
            .list_clips()
            .await
            .iter()
            .all(|c| c.local_id != shot.local_id));
        assert!(h.store.is_empty().await);
    }

    #[tokio::test]
    async fn discard_during_capture_frees_the_device() {
        let h = harness().await;
        let first = h.studio.create_shot(new_shot()).await.unwrap();
        h.studio
            .start_capture(first.local_id, first.dialogue_blocks[0].id)
            .await
            .unwrap();

        h.studio.discard_shot(first.local_id).await.unwrap();
        assert!(!h.capture.is_recording());

        let second = h.studio.create_shot(new_shot()).await.unwrap();
        assert!(h
            .studio
            .start_capture(second.local_id, second.dialogue_blocks[0].id)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn save_to_bin_requires_preview() {
        let h = harness().await;
        let shot = h.studio.create_shot(new_shot()).await.unwrap();
        assert_matches!(
            h.studio.save_to_bin(shot.local_id).await,
            Err(JobError::Conflict(_))
        );
    }

    #[tokio::test]
    async fn save_to_bin_promotes_and_drops_draft() {
        let h = harness().await;
        let shot = h.studio.create_shot(new_shot()).await.unwrap();
        h.studio.produce(shot.local_id).await.unwrap();
        h.studio.wait_idle().await;

        let clip = h.studio.save_to_bin(shot.local_id).await.unwrap();
        assert_eq!(clip.status, ClipStatus::Completed);
        assert!(h.studio.list_shots().await.is_empty());
        assert_eq!(h.store.len().await, 1);
        assert_eq!(h.studio.list_clips().await.len(), 1);
    }

    #[tokio::test]
    async fn capture_converts_take_into_block_audio() {
        let h = harness().await;
        h.converter.push_submit(json!({ "audio_url": "https://x/take-converted.wav" }));
        let shot = h.studio.create_shot(new_shot()).await.unwrap();
        let block_id = shot.dialogue_blocks[0].id;

        h.studio.start_capture(shot.local_id, block_id).await.unwrap();
        let flagged = h.studio.stop_capture(shot.local_id).await.unwrap();
        assert!(flagged.dialogue_blocks[0].is_generating);

        h.studio.wait_idle().await;
        let after = h.studio.get_shot(shot.local_id).await.unwrap();
        assert_eq!(
            after.dialogue_blocks[0].audio_ref.as_deref(),
            Some("https://x/take-converted.wav")
        );
        assert!(!after.dialogue_blocks[0].is_generating);
        assert!(h.converter.submitted()[0].source_audio.starts_with("data:audio/wav;base64,"));
    }

    #[tokio::test]
    async fn stop_without_start_is_rejected() {
        let h = harness().await;
        let shot = h.studio.create_shot(new_shot()).await.unwrap();
        assert_matches!(
            h.studio.stop_capture(shot.local_id).await,
            Err(JobError::Validation(_))
        );
    }

    #[tokio::test]
    async fn failed_revoice_keeps_raw_take() {
        let h = harness().await;
        h.converter.push_submit(json!({ "status": "failed", "error": "gpu lost" }));
        let shot = h.studio.create_shot(new_shot()).await.unwrap();
        let block_id = shot.dialogue_blocks[0].id;

        h.studio
            .revoice_block(
                shot.local_id,
                block_id,
                CapturedAudio {
                    bytes: b"RIFF".to_vec(),
                    mime: "audio/wav".into(),
                },
            )
            .await
            .unwrap();
        h.studio.wait_idle().await;

        let after = h.studio.get_shot(shot.local_id).await.unwrap();
        assert_eq!(
            after.dialogue_blocks[0].audio_ref.as_deref(),
            Some("data:audio/wav;base64,UklGRg==")
        );
        assert!(after.error_message.unwrap().contains("gpu lost"));
    }

    #[tokio::test]
    async fn revoice_reports_block_removed_meanwhile() {
        let h = harness().await;
        h.converter.push_submit(json!({ "job_id": "j-1", "status": "queued" }));
        h.converter.push_status(json!({ "job_id": "j-1", "status": "in_progress" }));
        h.converter.push_status(json!({
            "job_id": "j-1",
            "status": "completed",
            "audio_url": "https://x/take-converted.wav"
        }));
        let shot = h.studio.create_shot(new_shot()).await.unwrap();
        let block_id = shot.dialogue_blocks[0].id;

        h.studio
            .revoice_block(
                shot.local_id,
                block_id,
                CapturedAudio {
                    bytes: b"RIFF".to_vec(),
                    mime: "audio/wav".into(),
                },
            )
            .await
            .unwrap();
        h.studio
            .update_shot(
                shot.local_id,
                ShotChanges {
                    dialogue: Some(vec![DialogueInput {
                        id: None,
                        speaker_ref: "charA".into(),
                        text: "Goodbye".into(),
                        pause_after_seconds: 0.0,
                    }]),
                    ..ShotChanges::default()
                },
            )
            .await
            .unwrap();
        h.studio.wait_idle().await;

        let after = h.studio.get_shot(shot.local_id).await.unwrap();
        assert_eq!(after.dialogue_blocks.len(), 1);
        assert_ne!(after.dialogue_blocks[0].id, block_id);
        assert!(after.dialogue_blocks[0].audio_ref.is_none());
        assert!(after.error_message.unwrap().contains("removed"));
    }

    #[tokio::test]
    async fn revoice_after_discard_is_dropped() {
        let h = harness().await;
        h.converter.push_submit(json!({ "job_id": "j-1", "status": "queued" }));
        let shot = h.studio.create_shot(new_shot()).await.unwrap();

        h.studio
            .revoice_block(
                shot.local_id,
                shot.dialogue_blocks[0].id,
                CapturedAudio {
                    bytes: b"RIFF".to_vec(),
                    mime: "audio/wav".into(),
                },
            )
            .await
            .unwrap();
        h.studio.discard_shot(shot.local_id).await.unwrap();
        h.studio.wait_idle().await;

        assert!(h.studio.list_shots().await.is_empty());
    }
}
