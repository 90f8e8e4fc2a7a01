//! Dialogue synthesis job.
//!
//! Renders every dialogue line of a shot in one batched text-to-speech call,
//! optionally re-voices the result, and audio-locks the shot. The shot is
//! `generating` for the duration and always lands back in `draft`.

use std::sync::Arc;

use storyshot_core::error::JobError;
use storyshot_core::shot::{validate_dialogue_text, Shot, ShotStatus};
use storyshot_core::types::LocalId;
use storyshot_core::voice::VoiceLibrary;
use storyshot_providers::audio::AudioInput;
use storyshot_providers::tts::{TtsLine, TtsRequest};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::conversion::ConversionJob;
use crate::draft_store::DraftStore;
use crate::ports::SpeechSynthesizer;

/// Result of a successful synthesis.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisOutput {
    pub stitched_audio_ref: String,
    pub duration_seconds: f64,
}

pub struct SynthesisJob {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    conversion: Arc<ConversionJob>,
    drafts: Arc<DraftStore>,
    voices: Arc<RwLock<VoiceLibrary>>,
}

impl SynthesisJob {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        conversion: Arc<ConversionJob>,
        drafts: Arc<DraftStore>,
        voices: Arc<RwLock<VoiceLibrary>>,
    ) -> Self {
        Self {
            synthesizer,
            conversion,
            drafts,
            voices,
        }
    }

    /// Validate and run to completion.
    pub async fn run(
        &self,
        local_id: LocalId,
        cancel: &CancellationToken,
    ) -> Result<SynthesisOutput, JobError> {
        let shot = self.begin(local_id).await?;
        self.execute(shot, cancel).await
    }

    /// Check the dialogue and move the shot to `generating`.
    ///
    /// Validation failures are recorded on the shot without changing its
    /// status.
    pub async fn begin(&self, local_id: LocalId) -> Result<Shot, JobError> {
        let shot = self.drafts.require(local_id).await?;
        if let Err(e) = validate_dialogue_text(&shot.dialogue_blocks) {
            let err = JobError::from(e);
            let message = err.to_string();
            self.drafts
                .update(local_id, |s| s.error_message = Some(message))
                .await;
            return Err(err);
        }

        self.drafts
            .try_update(local_id, |s| {
                s.status = s.status.transition(ShotStatus::Generating)?;
                s.error_message = None;
                for block in &mut s.dialogue_blocks {
                    block.is_generating = true;
                }
                Ok(())
            })
            .await
    }

    /// Run the network part for a shot already in `generating`, then settle
    /// the shot back to `draft`.
    pub async fn execute(
        &self,
        shot: Shot,
        cancel: &CancellationToken,
    ) -> Result<SynthesisOutput, JobError> {
        let local_id = shot.local_id;
        tracing::info!(%local_id, lines = shot.dialogue_blocks.len(), "Synthesis started");

        let result = self.synthesize(&shot, cancel).await;

        let settled = self
            .drafts
            .update(local_id, |s| {
                s.status = ShotStatus::Draft;
                for block in &mut s.dialogue_blocks {
                    block.is_generating = false;
                }
                match &result {
                    Ok(output) => {
                        s.stitched_audio_ref = Some(output.stitched_audio_ref.clone());
                        s.total_audio_duration_seconds = Some(output.duration_seconds);
                        s.rendered_media_ref = None;
                        s.last_frame_ref = None;
                        s.error_message = None;
                    }
                    Err(e) => s.error_message = Some(e.to_string()),
                }
            })
            .await;

        match (&result, settled.is_some()) {
            (_, false) => tracing::info!(%local_id, "Shot discarded during synthesis"),
            (Ok(output), true) => tracing::info!(
                %local_id,
                duration_seconds = output.duration_seconds,
                "Synthesis finished",
            ),
            (Err(e), true) => tracing::warn!(%local_id, error = %e, "Synthesis failed"),
        }
        result
    }

    async fn synthesize(
        &self,
        shot: &Shot,
        cancel: &CancellationToken,
    ) -> Result<SynthesisOutput, JobError> {
        let voices = self.voices.read().await.clone();

        let lines: Vec<TtsLine> = shot
            .dialogue_blocks
            .iter()
            .map(|block| {
                let voice = voices.resolve(&block.speaker_ref);
                if voice.is_fallback() {
                    tracing::warn!(
                        local_id = %shot.local_id,
                        speaker_ref = %block.speaker_ref,
                        "Unknown speaker, using fallback voice",
                    );
                }
                TtsLine {
                    text: block.text.trim().to_string(),
                    voice,
                    pause_after_seconds: block.pause_after_seconds,
                }
            })
            .collect();

        let request = TtsRequest { lines };
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(JobError::Cancelled),
            result = self.synthesizer.synthesize(&request) => result?,
        };

        let audio = response
            .audio_ref()
            .ok_or(JobError::NoMediaFound("synthesis"))?;
        let duration_seconds = response.duration_secs().ok_or_else(|| {
            JobError::Network("Synthesis response carried no duration".to_string())
        })?;

        let stitched_audio_ref = if shot.convert_voice {
            self.convert(shot, &voices, audio, cancel).await?
        } else {
            audio
        };

        Ok(SynthesisOutput {
            stitched_audio_ref,
            duration_seconds,
        })
    }

    /// Re-voice towards the first line's voice. Conversion failures keep the
    /// unconverted audio; only cancellation propagates.
    async fn convert(
        &self,
        shot: &Shot,
        voices: &VoiceLibrary,
        audio: String,
        cancel: &CancellationToken,
    ) -> Result<String, JobError> {
        let Some(first) = shot.dialogue_blocks.first() else {
            return Ok(audio);
        };
        let source = voices.resolve(&first.speaker_ref);
        let Some(target) = voices.conversion_target(&source) else {
            tracing::warn!(
                local_id = %shot.local_id,
                speaker_ref = %first.speaker_ref,
                "No conversion target for voice, keeping synthesized audio",
            );
            return Ok(audio);
        };

        match self
            .conversion
            .run(AudioInput::Url(audio.clone()), &target, cancel)
            .await
        {
            Ok(converted) => Ok(converted),
            Err(JobError::Cancelled) => Err(JobError::Cancelled),
            Err(e) => {
                tracing::warn!(
                    local_id = %shot.local_id,
                    error = %e,
                    "Voice conversion failed, keeping synthesized audio",
                );
                Ok(audio)
            }
        }
    }
}
