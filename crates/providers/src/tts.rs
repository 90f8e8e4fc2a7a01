//! Text-to-speech client.
//!
//! One batched `POST /synthesize` renders every dialogue line of a shot into a
//! single stitched audio file.

use serde::{Deserialize, Serialize};
use storyshot_core::timing::samples_to_secs;
use storyshot_core::voice::VoiceSource;

use crate::audio::materialize;
use crate::http::{join_url, post_json, ProviderError};

/// One dialogue line in a synthesis batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TtsLine {
    pub text: String,
    pub voice: VoiceSource,
    pub pause_after_seconds: f64,
}

/// Batched synthesis request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TtsRequest {
    pub lines: Vec<TtsLine>,
}

/// Synthesis response.
///
/// Duration arrives either as a sample count plus sample rate or as seconds;
/// older service versions use camelCase field names.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TtsResponse {
    #[serde(default, alias = "audioUrl")]
    pub audio_url: Option<String>,
    #[serde(default, alias = "audioBase64")]
    pub audio_base64: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default, alias = "durationSamples")]
    pub duration_samples: Option<f64>,
    #[serde(default, alias = "sampleRate")]
    pub sample_rate: Option<u32>,
    #[serde(default, alias = "durationSeconds")]
    pub duration_seconds: Option<f64>,
}

impl TtsResponse {
    /// Stitched audio as a playable reference (URL or data URI).
    pub fn audio_ref(&self) -> Option<String> {
        materialize(
            self.audio_url.as_deref(),
            self.audio_base64.as_deref(),
            self.format.as_deref(),
        )
    }

    /// Duration in seconds. The sample-count encoding takes precedence.
    pub fn duration_secs(&self) -> Option<f64> {
        if let (Some(samples), Some(rate)) = (self.duration_samples, self.sample_rate) {
            if samples.is_finite() && samples >= 0.0 {
                if let Some(secs) = samples_to_secs(samples.round() as u64, rate) {
                    return Some(secs);
                }
            }
        }
        self.duration_seconds.filter(|d| d.is_finite() && *d >= 0.0)
    }
}

/// HTTP client for the text-to-speech service.
pub struct TtsApi {
    client: reqwest::Client,
    base_url: String,
}

impl TtsApi {
    /// * `base_url` - Base HTTP URL, e.g. `http://tts:8000`.
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a batched synthesis request.
    pub async fn synthesize(&self, request: &TtsRequest) -> Result<TtsResponse, ProviderError> {
        let url = join_url(&self.base_url, "synthesize");
        tracing::debug!(lines = request.lines.len(), %url, "Submitting synthesis batch");
        post_json(&self.client, &url, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sample_encoding_takes_precedence() {
        let resp: TtsResponse = serde_json::from_value(json!({
            "audio_url": "https://x/a.wav",
            "duration_samples": 72_000,
            "sample_rate": 24_000,
            "duration_seconds": 9.9,
        }))
        .unwrap();
        assert_eq!(resp.duration_secs(), Some(3.0));
    }

    #[test]
    fn fractional_sample_count_is_rounded() {
        let resp: TtsResponse = serde_json::from_value(json!({
            "audio_url": "https://x/a.wav",
            "durationSamples": 47_999.6,
            "sampleRate": 24_000,
        }))
        .unwrap();
        assert_eq!(resp.duration_secs(), Some(2.0));
    }

    #[test]
    fn seconds_encoding_used_alone() {
        let resp: TtsResponse =
            serde_json::from_value(json!({ "audioUrl": "https://x/a.wav", "durationSeconds": 2.5 }))
                .unwrap();
        assert_eq!(resp.duration_secs(), Some(2.5));
        assert_eq!(resp.audio_ref().as_deref(), Some("https://x/a.wav"));
    }

    #[test]
    fn zero_sample_rate_falls_back_to_seconds() {
        let resp = TtsResponse {
            duration_samples: Some(100.0),
            sample_rate: Some(0),
            duration_seconds: Some(1.5),
            ..Default::default()
        };
        assert_eq!(resp.duration_secs(), Some(1.5));
    }

    #[test]
    fn inline_audio_materialized() {
        let resp = TtsResponse {
            audio_base64: Some("AAAA".into()),
            format: Some("wav".into()),
            ..Default::default()
        };
        assert_eq!(resp.audio_ref().as_deref(), Some("data:audio/wav;base64,AAAA"));
    }

    #[test]
    fn request_serializes_voice_tag() {
        let req = TtsRequest {
            lines: vec![TtsLine {
                text: "Hello".into(),
                voice: VoiceSource::ClonedAudio { url: "https://x/a.wav".into() },
                pause_after_seconds: 0.5,
            }],
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["lines"][0]["voice"]["kind"], "cloned_audio");
        assert_eq!(value["lines"][0]["pause_after_seconds"], 0.5);
    }
}
