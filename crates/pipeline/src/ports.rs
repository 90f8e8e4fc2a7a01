//! Boundaries to the outside world.
//!
//! Jobs only talk to external services through these traits. Production
//! implementations wrap the `storyshot-providers` clients and the
//! `storyshot-db` repository; tests use the fakes in `crate::testing`.

use async_trait::async_trait;
use storyshot_core::types::DbId;
use storyshot_db::models::clip::{Clip, ClipFilter, UpsertClip};
use storyshot_db::repositories::ClipRepo;
use storyshot_db::DbPool;
use storyshot_providers::audio::AudioInput;
use storyshot_providers::conversion::{ConversionApi, ConversionRequest, ConversionResponse};
use storyshot_providers::render::{RenderApi, RenderRequest, RendererKind};
use storyshot_providers::tts::{TtsApi, TtsRequest, TtsResponse};
use storyshot_providers::ProviderError;

use crate::error::{CaptureError, StoreError};

// ---------------------------------------------------------------------------
// Generation services
// ---------------------------------------------------------------------------

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, request: &TtsRequest) -> Result<TtsResponse, ProviderError>;
}

#[async_trait]
pub trait VoiceConverter: Send + Sync {
    async fn submit(&self, request: &ConversionRequest)
        -> Result<ConversionResponse, ProviderError>;

    async fn status(&self, job_id: &str) -> Result<ConversionResponse, ProviderError>;
}

#[async_trait]
pub trait VideoRenderer: Send + Sync {
    /// Render and return the raw response body for media extraction.
    async fn render(
        &self,
        kind: RendererKind,
        request: &RenderRequest,
    ) -> Result<serde_json::Value, ProviderError>;
}

#[async_trait]
impl SpeechSynthesizer for TtsApi {
    async fn synthesize(&self, request: &TtsRequest) -> Result<TtsResponse, ProviderError> {
        TtsApi::synthesize(self, request).await
    }
}

#[async_trait]
impl VoiceConverter for ConversionApi {
    async fn submit(
        &self,
        request: &ConversionRequest,
    ) -> Result<ConversionResponse, ProviderError> {
        ConversionApi::submit(self, request).await
    }

    async fn status(&self, job_id: &str) -> Result<ConversionResponse, ProviderError> {
        ConversionApi::status(self, job_id).await
    }
}

#[async_trait]
impl VideoRenderer for RenderApi {
    async fn render(
        &self,
        kind: RendererKind,
        request: &RenderRequest,
    ) -> Result<serde_json::Value, ProviderError> {
        RenderApi::render(self, kind, request).await
    }
}

// ---------------------------------------------------------------------------
// Remote clip store
// ---------------------------------------------------------------------------

/// The remote durable store for clips.
///
/// Writes are upserts: `id = Some` updates in place, `id = None` inserts keyed
/// on `local_id`.
#[async_trait]
pub trait ClipStore: Send + Sync {
    async fn upsert(&self, input: &UpsertClip) -> Result<Clip, StoreError>;

    /// Newest first.
    async fn list(&self, filter: &ClipFilter) -> Result<Vec<Clip>, StoreError>;

    /// Returns `true` if a clip was removed.
    async fn delete(&self, id: DbId) -> Result<bool, StoreError>;
}

/// [`ClipStore`] over PostgreSQL.
pub struct PgClipStore {
    pool: DbPool,
}

impl PgClipStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClipStore for PgClipStore {
    async fn upsert(&self, input: &UpsertClip) -> Result<Clip, StoreError> {
        Ok(ClipRepo::upsert(&self.pool, input).await?)
    }

    async fn list(&self, filter: &ClipFilter) -> Result<Vec<Clip>, StoreError> {
        Ok(ClipRepo::list(&self.pool, filter).await?)
    }

    async fn delete(&self, id: DbId) -> Result<bool, StoreError> {
        Ok(ClipRepo::delete(&self.pool, id).await?)
    }
}

// ---------------------------------------------------------------------------
// Audio capture
// ---------------------------------------------------------------------------

/// Audio recorded from a capture device or uploaded by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedAudio {
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl CapturedAudio {
    /// The recording as an inline provider input.
    pub fn into_input(self) -> AudioInput {
        AudioInput::Inline {
            bytes: self.bytes,
            mime: self.mime,
        }
    }
}

/// A local recording device. One capture at a time.
#[async_trait]
pub trait AudioCapture: Send + Sync {
    async fn start(&self) -> Result<(), CaptureError>;

    async fn stop(&self) -> Result<CapturedAudio, CaptureError>;
}
