//! Integration tests for the `/clips` and `/voices` endpoints.

mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, create_shot, get, send, send_json, TestApp};
use serde_json::json;

/// Produce a shot and save it to the bin. Returns the clip's remote id.
async fn saved_clip(app: &TestApp) -> i64 {
    let id = create_shot(app).await;
    send(app, Method::POST, &format!("/api/v1/shots/{id}/produce")).await;
    app.settle().await;
    let saved = body_json(send(app, Method::POST, &format!("/api/v1/shots/{id}/save")).await).await;
    saved["data"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn bin_starts_empty() {
    let app = common::build_test_app().await;

    let json = body_json(get(&app, "/api/v1/clips").await).await;

    assert!(json["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn refresh_returns_stored_clips() {
    let app = common::build_test_app().await;
    let clip_id = saved_clip(&app).await;

    let response = send(&app, Method::POST, "/api/v1/clips/refresh").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let clips = json["data"].as_array().unwrap();
    assert_eq!(clips.len(), 1);
    assert_eq!(clips[0]["id"], clip_id);
    assert_eq!(clips[0]["status"], "completed");
}

#[tokio::test]
async fn delete_removes_clip_from_bin_and_store() {
    let app = common::build_test_app().await;
    let clip_id = saved_clip(&app).await;

    let response = send(&app, Method::DELETE, &format!("/api/v1/clips/{clip_id}")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let json = body_json(get(&app, "/api/v1/clips").await).await;
    assert!(json["data"].as_array().unwrap().is_empty());
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn voice_library_round_trips() {
    let app = common::build_test_app().await;
    let library = json!({
        "characters": [],
        "voices": [{ "id": "v-warm", "name": "Warm", "sample_url": "https://x/warm.wav" }]
    });

    let response = send_json(&app, Method::PUT, "/api/v1/voices", library).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(get(&app, "/api/v1/voices").await).await;
    assert_eq!(json["data"]["voices"][0]["id"], "v-warm");
    assert!(json["data"]["characters"].as_array().unwrap().is_empty());
}
