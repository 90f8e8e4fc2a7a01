//! Voice conversion job: submit, then poll until the remote job settles.

use std::sync::Arc;
use std::time::Duration;

use storyshot_core::error::JobError;
use storyshot_providers::audio::AudioInput;
use storyshot_providers::conversion::{ConversionOutcome, ConversionParams, ConversionRequest};
use tokio_util::sync::CancellationToken;

use crate::ports::{CapturedAudio, VoiceConverter};

/// Default delay between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default cap on status polls (ten minutes at the default interval).
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 300;

#[derive(Debug, Clone)]
pub struct ConversionSettings {
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
    pub params: ConversionParams,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            params: ConversionParams::default(),
        }
    }
}

pub struct ConversionJob {
    converter: Arc<dyn VoiceConverter>,
    settings: ConversionSettings,
}

impl ConversionJob {
    pub fn new(converter: Arc<dyn VoiceConverter>, settings: ConversionSettings) -> Self {
        Self {
            converter,
            settings,
        }
    }

    /// Convert `source` towards the timbre of `target_audio`.
    ///
    /// Returns the converted audio as a URL or `data:` URI.
    pub async fn run(
        &self,
        source: AudioInput,
        target_audio: &str,
        cancel: &CancellationToken,
    ) -> Result<String, JobError> {
        let request = ConversionRequest {
            source_audio: source.to_wire(),
            target_audio: target_audio.to_string(),
            params: self.settings.params.clone(),
        };

        let submitted = tokio::select! {
            _ = cancel.cancelled() => return Err(JobError::Cancelled),
            result = self.converter.submit(&request) => result?,
        };

        match submitted.outcome()? {
            ConversionOutcome::Ready(audio) => {
                tracing::debug!("Conversion finished synchronously");
                Ok(audio)
            }
            ConversionOutcome::Failed(message) => Err(JobError::RemoteJobFailed(message)),
            ConversionOutcome::Pending(job_id) if job_id.is_empty() => Err(JobError::Network(
                "Conversion accepted without a job id".to_string(),
            )),
            ConversionOutcome::Pending(job_id) => self.poll(&job_id, cancel).await,
        }
    }

    /// Direct-capture variant: the recording is sent inline.
    pub async fn run_captured(
        &self,
        captured: CapturedAudio,
        target_audio: &str,
        cancel: &CancellationToken,
    ) -> Result<String, JobError> {
        self.run(captured.into_input(), target_audio, cancel).await
    }

    async fn poll(&self, job_id: &str, cancel: &CancellationToken) -> Result<String, JobError> {
        tracing::info!(job_id, "Conversion queued, polling for result");

        for attempt in 1..=self.settings.max_poll_attempts {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(job_id, attempt, "Conversion polling cancelled");
                    return Err(JobError::Cancelled);
                }
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
            }

            let response = self.converter.status(job_id).await?;
            match response.outcome()? {
                ConversionOutcome::Ready(audio) => {
                    tracing::info!(job_id, attempt, "Conversion completed");
                    return Ok(audio);
                }
                ConversionOutcome::Failed(message) => {
                    tracing::warn!(job_id, attempt, error = %message, "Conversion failed remotely");
                    return Err(JobError::RemoteJobFailed(message));
                }
                ConversionOutcome::Pending(_) => {}
            }
        }

        Err(JobError::Network(format!(
            "Conversion job {job_id} did not finish after {} polls",
            self.settings.max_poll_attempts
        )))
    }
}
