//! In-memory fakes for every port, for unit and API tests.
//!
//! Each fake replays queued responses and falls back to a canned success
//! when its queue is empty, and records what it was sent.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use serde_json::{json, Value};
use storyshot_core::types::{DbId, Timestamp};
use storyshot_db::models::clip::{Clip, ClipFilter, UpsertClip};
use storyshot_events::EventBus;
use storyshot_providers::conversion::{ConversionRequest, ConversionResponse};
use storyshot_providers::render::{RenderRequest, RendererKind};
use storyshot_providers::tts::{TtsRequest, TtsResponse};
use storyshot_providers::ProviderError;
use tokio::sync::Semaphore;

use crate::clock::Clock;
use crate::draft_store::DraftStore;
use crate::error::{CaptureError, StoreError};
use crate::memory_store::InMemoryClipStore;
use crate::ports::{AudioCapture, CapturedAudio, ClipStore, SpeechSynthesizer, VideoRenderer, VoiceConverter};
use crate::storage::MemorySnapshotStorage;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// `Ok(body)` is decoded as the response, `Err(status)` is an API error.
pub type Scripted = Result<Value, u16>;

fn replay<T: serde::de::DeserializeOwned>(scripted: Scripted) -> Result<T, ProviderError> {
    match scripted {
        Ok(body) => serde_json::from_value(body).map_err(|e| ProviderError::Decode(e.to_string())),
        Err(status) => Err(ProviderError::ApiError {
            status,
            body: "scripted failure".to_string(),
        }),
    }
}

/// Draft store over in-memory snapshot storage.
pub async fn memory_drafts() -> Arc<DraftStore> {
    match DraftStore::open(
        Arc::new(MemorySnapshotStorage::new()),
        Arc::new(EventBus::default()),
    )
    .await
    {
        Ok(store) => Arc::new(store),
        Err(e) => panic!("memory storage cannot fail to open: {e}"),
    }
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// A clock that only moves when told to.
pub struct FixedClock {
    now: Mutex<Timestamp>,
}

impl FixedClock {
    pub fn at(now: Timestamp) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: Timestamp) {
        *lock(&self.now) = now;
    }

    pub fn advance(&self, by: Duration) {
        *lock(&self.now) += by;
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        Self::at(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().unwrap_or_default())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        *lock(&self.now)
    }
}

// ---------------------------------------------------------------------------
// Synthesizer
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeSynthesizer {
    responses: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<TtsRequest>>,
}

impl FakeSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, response: Scripted) {
        lock(&self.responses).push_back(response);
    }

    pub fn requests(&self) -> Vec<TtsRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize(&self, request: &TtsRequest) -> Result<TtsResponse, ProviderError> {
        lock(&self.requests).push(request.clone());
        let next = lock(&self.responses).pop_front().unwrap_or_else(|| {
            Ok(json!({ "audio_url": "https://fake/speech.wav", "duration_seconds": 2.0 }))
        });
        replay(next)
    }
}

// ---------------------------------------------------------------------------
// Converter
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeConverter {
    submits: Mutex<VecDeque<Value>>,
    statuses: Mutex<VecDeque<Value>>,
    submitted: Mutex<Vec<ConversionRequest>>,
    status_calls: AtomicUsize,
}

impl FakeConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_submit(&self, body: Value) {
        lock(&self.submits).push_back(body);
    }

    /// Queue a status poll answer. With the queue empty, polls report
    /// `in_progress`.
    pub fn push_status(&self, body: Value) {
        lock(&self.statuses).push_back(body);
    }

    pub fn submitted(&self) -> Vec<ConversionRequest> {
        lock(&self.submitted).clone()
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VoiceConverter for FakeConverter {
    async fn submit(
        &self,
        request: &ConversionRequest,
    ) -> Result<ConversionResponse, ProviderError> {
        lock(&self.submitted).push(request.clone());
        let body = lock(&self.submits)
            .pop_front()
            .unwrap_or_else(|| json!({ "audio_url": "https://fake/converted.wav" }));
        replay(Ok(body))
    }

    async fn status(&self, _job_id: &str) -> Result<ConversionResponse, ProviderError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let body = lock(&self.statuses)
            .pop_front()
            .unwrap_or_else(|| json!({ "status": "in_progress" }));
        replay(Ok(body))
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeRenderer {
    responses: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<(RendererKind, RenderRequest)>>,
    gate: Option<Semaphore>,
}

impl FakeRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A renderer that blocks every call until [`release`](Self::release).
    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::default()
        }
    }

    /// Let one blocked render proceed.
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub fn push(&self, response: Scripted) {
        lock(&self.responses).push_back(response);
    }

    pub fn requests(&self) -> Vec<(RendererKind, RenderRequest)> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl VideoRenderer for FakeRenderer {
    async fn render(
        &self,
        kind: RendererKind,
        request: &RenderRequest,
    ) -> Result<Value, ProviderError> {
        lock(&self.requests).push((kind, request.clone()));
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        let next = lock(&self.responses)
            .pop_front()
            .unwrap_or_else(|| Ok(json!({ "video_url": "https://fake/render.mp4" })));
        replay(next)
    }
}

// ---------------------------------------------------------------------------
// Clip store
// ---------------------------------------------------------------------------

/// Wraps an [`InMemoryClipStore`] with switchable write failures.
pub struct FlakyClipStore {
    inner: InMemoryClipStore,
    fail_writes: AtomicBool,
}

impl FlakyClipStore {
    pub fn new(inner: InMemoryClipStore) -> Self {
        Self {
            inner,
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make upserts and deletes fail until switched back.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &InMemoryClipStore {
        &self.inner
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("scripted failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ClipStore for FlakyClipStore {
    async fn upsert(&self, input: &UpsertClip) -> Result<Clip, StoreError> {
        self.check()?;
        self.inner.upsert(input).await
    }

    async fn list(&self, filter: &ClipFilter) -> Result<Vec<Clip>, StoreError> {
        self.inner.list(filter).await
    }

    async fn delete(&self, id: DbId) -> Result<bool, StoreError> {
        self.check()?;
        self.inner.delete(id).await
    }
}

// ---------------------------------------------------------------------------
// Capture device
// ---------------------------------------------------------------------------

/// Capture device that returns a fixed recording.
#[derive(Default)]
pub struct FakeCapture {
    recording: AtomicBool,
}

impl FakeCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioCapture for FakeCapture {
    async fn start(&self) -> Result<(), CaptureError> {
        if self.recording.swap(true, Ordering::SeqCst) {
            return Err(CaptureError::Busy);
        }
        Ok(())
    }

    async fn stop(&self) -> Result<CapturedAudio, CaptureError> {
        if !self.recording.swap(false, Ordering::SeqCst) {
            return Err(CaptureError::NotStarted);
        }
        Ok(CapturedAudio {
            bytes: b"RIFF".to_vec(),
            mime: "audio/wav".to_string(),
        })
    }
}
