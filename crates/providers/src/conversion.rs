//! Voice conversion client.
//!
//! `POST /convert` either answers with the converted audio straight away or
//! hands back a job id that is polled with `GET /status/{job_id}`.

use serde::{Deserialize, Serialize};

use crate::audio::materialize;
use crate::http::{get_json, join_url, post_json, ProviderError};

/// Tuning parameters forwarded to the conversion model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionParams {
    pub diffusion_steps: u32,
    pub length_adjust: f64,
    pub inference_cfg_rate: f64,
    pub pitch_shift: i32,
}

impl Default for ConversionParams {
    fn default() -> Self {
        Self {
            diffusion_steps: 25,
            length_adjust: 1.0,
            inference_cfg_rate: 0.7,
            pitch_shift: 0,
        }
    }
}

/// Conversion request. Audio fields are URLs or `data:` URIs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionRequest {
    pub source_audio: String,
    pub target_audio: String,
    pub params: ConversionParams,
}

/// Remote job state reported by the conversion service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteJobStatus {
    Queued,
    #[serde(alias = "inProgress")]
    InProgress,
    Completed,
    Failed,
}

impl RemoteJobStatus {
    pub fn is_pending(self) -> bool {
        matches!(self, Self::Queued | Self::InProgress)
    }
}

/// Body shared by the submit and status endpoints.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConversionResponse {
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub status: Option<RemoteJobStatus>,
    #[serde(default, alias = "output_url")]
    pub audio_url: Option<String>,
    #[serde(default, alias = "output_base64")]
    pub audio_base64: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// What a conversion response means for the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    /// Output is ready, as a URL or data URI.
    Ready(String),
    /// Still running remotely; poll this job id.
    Pending(String),
    /// The remote job failed.
    Failed(String),
}

impl ConversionResponse {
    /// Classify the response.
    ///
    /// Output wins whenever present. Otherwise the status decides; a body
    /// without a status but with a job id is treated as queued. A pending
    /// outcome may carry an empty job id when the service omits it on
    /// status polls.
    pub fn outcome(&self) -> Result<ConversionOutcome, ProviderError> {
        if let Some(audio) = materialize(
            self.audio_url.as_deref(),
            self.audio_base64.as_deref(),
            self.format.as_deref(),
        ) {
            return Ok(ConversionOutcome::Ready(audio));
        }

        let job_id = self.job_id.as_deref().map(str::trim).unwrap_or("");
        match self.status {
            Some(RemoteJobStatus::Failed) => Ok(ConversionOutcome::Failed(
                self.error
                    .clone()
                    .unwrap_or_else(|| "Conversion job failed".to_string()),
            )),
            Some(RemoteJobStatus::Completed) => Err(ProviderError::Decode(
                "Conversion completed without output".to_string(),
            )),
            Some(_) => Ok(ConversionOutcome::Pending(job_id.to_string())),
            None if !job_id.is_empty() => Ok(ConversionOutcome::Pending(job_id.to_string())),
            None => Err(ProviderError::Decode(
                "Conversion response has neither output nor job id".to_string(),
            )),
        }
    }
}

/// HTTP client for the voice conversion service.
pub struct ConversionApi {
    client: reqwest::Client,
    base_url: String,
}

impl ConversionApi {
    /// * `base_url` - Base HTTP URL, e.g. `http://convert:8001`.
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// Submit a conversion.
    pub async fn submit(
        &self,
        request: &ConversionRequest,
    ) -> Result<ConversionResponse, ProviderError> {
        let url = join_url(&self.base_url, "convert");
        tracing::debug!(%url, "Submitting voice conversion");
        post_json(&self.client, &url, request).await
    }

    /// Fetch the state of a running conversion job.
    pub async fn status(&self, job_id: &str) -> Result<ConversionResponse, ProviderError> {
        let url = join_url(&self.base_url, &format!("status/{job_id}"));
        get_json(&self.client, &url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> ConversionResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn immediate_url_output_is_ready() {
        let resp = parse(json!({ "audio_url": "https://x/conv.wav" }));
        assert_eq!(
            resp.outcome().unwrap(),
            ConversionOutcome::Ready("https://x/conv.wav".into())
        );
    }

    #[test]
    fn inline_output_becomes_data_uri() {
        let resp = parse(json!({ "status": "completed", "audio_base64": "AAAA", "format": "wav" }));
        assert_eq!(
            resp.outcome().unwrap(),
            ConversionOutcome::Ready("data:audio/wav;base64,AAAA".into())
        );
    }

    #[test]
    fn queued_job_is_pending() {
        let resp = parse(json!({ "job_id": "j-1", "status": "queued" }));
        assert_eq!(resp.outcome().unwrap(), ConversionOutcome::Pending("j-1".into()));

        let resp = parse(json!({ "status": "in_progress" }));
        assert!(resp.status.unwrap().is_pending());
        assert_eq!(resp.outcome().unwrap(), ConversionOutcome::Pending(String::new()));
    }

    #[test]
    fn camel_case_in_progress_is_pending() {
        let resp = parse(json!({ "job_id": "j-1", "status": "inProgress" }));
        assert_eq!(resp.status, Some(RemoteJobStatus::InProgress));
        assert_eq!(resp.outcome().unwrap(), ConversionOutcome::Pending("j-1".into()));
    }

    #[test]
    fn failed_job_carries_message() {
        let resp = parse(json!({ "job_id": "j-1", "status": "failed", "error": "OOM" }));
        assert_eq!(resp.outcome().unwrap(), ConversionOutcome::Failed("OOM".into()));
    }

    #[test]
    fn completed_without_output_is_malformed() {
        let resp = parse(json!({ "job_id": "j-1", "status": "completed" }));
        assert_matches!(resp.outcome(), Err(ProviderError::Decode(_)));
    }

    #[test]
    fn empty_body_is_malformed() {
        assert_matches!(parse(json!({})).outcome(), Err(ProviderError::Decode(_)));
    }

    #[test]
    fn default_params_serialize() {
        let req = ConversionRequest {
            source_audio: "https://x/src.wav".into(),
            target_audio: "https://x/tgt.wav".into(),
            params: ConversionParams::default(),
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["params"]["diffusion_steps"], 25);
        assert_eq!(value["params"]["pitch_shift"], 0);
    }
}
