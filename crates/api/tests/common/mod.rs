#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use storyshot_core::voice::{Character, VoiceLibrary};
use storyshot_events::EventBus;
use storyshot_pipeline::memory_store::InMemoryClipStore;
use storyshot_pipeline::storage::MemorySnapshotStorage;
use storyshot_pipeline::testing::{
    FakeConverter, FakeRenderer, FakeSynthesizer, FixedClock,
};
use storyshot_pipeline::{Studio, StudioConfig, StudioDeps};
use tower::ServiceExt;

use storyshot_api::config::ServerConfig;
use storyshot_api::router::build_app_router;
use storyshot_api::state::AppState;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        database_url: None,
        drafts_path: PathBuf::from("unused.json"),
        tts_url: "http://tts.test".to_string(),
        conversion_url: "http://convert.test".to_string(),
        lipsync_url: "http://lipsync.test".to_string(),
        image_to_video_url: "http://i2v.test".to_string(),
        provider_timeout_secs: 5,
        conversion_poll_interval_ms: 10,
        conversion_max_polls: 5,
        merge_window_secs: 300,
        clip_list_limit: 100,
    }
}

/// The application plus handles on its fakes.
pub struct TestApp {
    pub router: Router,
    pub studio: Arc<Studio>,
    pub synthesizer: Arc<FakeSynthesizer>,
    pub converter: Arc<FakeConverter>,
    pub renderer: Arc<FakeRenderer>,
    pub store: Arc<InMemoryClipStore>,
}

impl TestApp {
    /// Wait for background jobs started by earlier requests.
    pub async fn settle(&self) {
        self.studio.wait_idle().await;
    }
}

/// Build the full application router over in-memory fakes.
///
/// Uses the same middleware stack as `main.rs`.
pub async fn build_test_app() -> TestApp {
    build_test_app_with(FakeRenderer::new()).await
}

pub async fn build_test_app_with(renderer: FakeRenderer) -> TestApp {
    let config = test_config();
    let synthesizer = Arc::new(FakeSynthesizer::new());
    let converter = Arc::new(FakeConverter::new());
    let renderer = Arc::new(renderer);
    let store = Arc::new(InMemoryClipStore::new());

    let studio = Studio::open(
        StudioDeps {
            synthesizer: synthesizer.clone(),
            converter: converter.clone(),
            renderer: renderer.clone(),
            store: store.clone(),
            storage: Arc::new(MemorySnapshotStorage::new()),
            capture: None,
            bus: Arc::new(EventBus::default()),
            clock: Arc::new(FixedClock::default()),
        },
        StudioConfig::default(),
    )
    .await
    .unwrap();

    studio
        .set_voice_library(VoiceLibrary {
            characters: vec![Character {
                id: "charA".into(),
                name: "Ada".into(),
                voice_id: Some("cloned".into()),
                voice_ref_url: Some("https://x/a.wav".into()),
            }],
            voices: vec![],
        })
        .await;

    let state = AppState {
        studio: studio.clone(),
        pool: None,
    };

    TestApp {
        router: build_app_router(state, &config),
        studio,
        synthesizer,
        converter,
        renderer,
        store,
    }
}

/// Send a request without a body.
pub async fn send(app: &TestApp, method: Method, uri: &str) -> Response {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.router.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &TestApp, uri: &str) -> Response {
    send(app, Method::GET, uri).await
}

/// Send a request with a JSON body.
pub async fn send_json(app: &TestApp, method: Method, uri: &str, body: Value) -> Response {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.router.clone().oneshot(request).await.unwrap()
}

pub async fn post_json(app: &TestApp, uri: &str, body: Value) -> Response {
    send_json(app, Method::POST, uri, body).await
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// A valid draft body with one line for `charA`.
pub fn shot_body() -> Value {
    serde_json::json!({
        "name": "Opening",
        "dialogue": [{ "speaker_ref": "charA", "text": "Hello" }],
        "visual_prompt": "a lighthouse at dusk",
        "keyframe_ref": "https://x/key.png"
    })
}

/// Create a draft and return its `local_id`.
pub async fn create_shot(app: &TestApp) -> String {
    let response = post_json(app, "/api/v1/shots", shot_body()).await;
    let json = body_json(response).await;
    json["data"]["local_id"].as_str().unwrap().to_string()
}
