//! Video rendering client.
//!
//! Two renderers share one request shape: a lip-sync model for on-screen
//! speakers and an image-to-video model for narration. Both answer with
//! loosely structured JSON that is handed back untouched so the caller can
//! run media extraction over it.

use serde::Serialize;
use storyshot_core::shot::SpeakerMode;

use crate::http::{join_url, post_json, ProviderError};

/// Which rendering backend to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RendererKind {
    LipSync,
    ImageToVideo,
}

impl RendererKind {
    /// Lip-sync for on-screen speakers, image-to-video otherwise.
    pub fn for_mode(mode: SpeakerMode) -> Self {
        match mode {
            SpeakerMode::OnScreen => Self::LipSync,
            SpeakerMode::Narrator => Self::ImageToVideo,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LipSync => "lip_sync",
            Self::ImageToVideo => "image_to_video",
        }
    }

    /// Whether the renderer needs the stitched dialogue audio.
    pub fn requires_audio(&self) -> bool {
        matches!(self, Self::LipSync)
    }
}

/// Per-line metadata the renderer uses to pace mouth movement and cuts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DialogueMeta {
    pub speaker_ref: String,
    pub text: String,
    pub pause_after_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderRequest {
    pub prompt: String,
    pub image_ref: Option<String>,
    pub audio_ref: Option<String>,
    pub motion_preset: Option<String>,
    pub frame_count: u32,
    pub dialogue_meta: Vec<DialogueMeta>,
}

/// HTTP client for both rendering services.
pub struct RenderApi {
    client: reqwest::Client,
    lipsync_url: String,
    image_to_video_url: String,
}

impl RenderApi {
    pub fn new(client: reqwest::Client, lipsync_url: String, image_to_video_url: String) -> Self {
        Self {
            client,
            lipsync_url,
            image_to_video_url,
        }
    }

    fn base_url(&self, kind: RendererKind) -> &str {
        match kind {
            RendererKind::LipSync => &self.lipsync_url,
            RendererKind::ImageToVideo => &self.image_to_video_url,
        }
    }

    /// Render a clip and return the raw response body.
    ///
    /// Blocks until the service finishes, so the client timeout bounds it.
    pub async fn render(
        &self,
        kind: RendererKind,
        request: &RenderRequest,
    ) -> Result<serde_json::Value, ProviderError> {
        let url = join_url(self.base_url(kind), "render");
        tracing::debug!(
            renderer = kind.as_str(),
            frame_count = request.frame_count,
            %url,
            "Submitting render",
        );
        post_json(&self.client, &url, request).await
    }
}
