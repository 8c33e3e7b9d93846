//! HTTP API integration tests
//!
//! Exercises the router with `tower::ServiceExt::oneshot`, no socket needed.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use lofai_common::events::EventBus;
use lofai_radio::coordinator::GenerationQueue;
use lofai_radio::presence::PresenceBroadcaster;
use lofai_radio::prompt::PreferenceStore;
use lofai_radio::rotation::RotationStore;
use lofai_radio::scheduler::PlaybackScheduler;
use lofai_radio::{build_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

struct TestApp {
    _dir: TempDir,
    router: Router,
    state: AppState,
}

fn setup_with_queue(generation: GenerationQueue) -> TestApp {
    let dir = TempDir::new().unwrap();
    let event_bus = EventBus::new(100);
    let store = Arc::new(RotationStore::new(dir.path().join("audio"), 10));
    let scheduler = Arc::new(PlaybackScheduler::new(
        Arc::clone(&store),
        generation.clone(),
        event_bus.clone(),
        None,
    ));

    let state = AppState::new(
        store,
        Arc::new(PreferenceStore::new()),
        scheduler,
        generation,
        Arc::new(PresenceBroadcaster::new(event_bus.clone())),
        event_bus,
    );

    TestApp {
        _dir: dir,
        router: build_router(state.clone()),
        state,
    }
}

fn setup() -> TestApp {
    setup_with_queue(GenerationQueue::disabled())
}

async fn make_request(
    app: &Router,
    method: Method,
    path: &str,
    body: Option<Value>,
) -> (StatusCode, Option<Value>) {
    let builder = Request::builder().method(method).uri(path);
    let request = match body {
        Some(json_body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json_body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();

    let json_body = if bytes.is_empty() {
        None
    } else {
        Some(serde_json::from_slice(&bytes).unwrap())
    };
    (status, json_body)
}

/// Put a payload on disk and mark the slot Ready
async fn publish_slot(state: &AppState, index: usize, payload: &[u8]) {
    let path = state.store.committed_path(index);
    tokio::fs::create_dir_all(state.store.audio_dir()).await.unwrap();
    tokio::fs::write(&path, payload).await.unwrap();
    state.store.set_slot_ready(index, path).await.unwrap();
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = setup();

    let (status, body) = make_request(&app.router, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    let body = body.expect("Expected response body");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "lofai-radio");
    assert!(body["version"].is_string());
    assert_eq!(body["current_track"], 0);
    assert_eq!(body["listeners"], 0);
    assert_eq!(body["generator_ready"], false);
}

#[tokio::test]
async fn test_health_reports_generator_ready_with_worker() {
    let (queue, _rx) = GenerationQueue::channel();
    let app = setup_with_queue(queue);

    let (_, body) = make_request(&app.router, Method::GET, "/health", None).await;

    assert_eq!(body.unwrap()["generator_ready"], true);
}

#[tokio::test]
async fn test_stream_empty_slot_is_not_yet_generated() {
    let app = setup();

    let (status, body) = make_request(&app.router, Method::GET, "/api/stream?track=4", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    let body = body.unwrap();
    assert_eq!(body["error"], "Audio not yet generated");
    assert_eq!(body["track"], 4);
}

#[tokio::test]
async fn test_stream_generating_slot_is_not_yet_generated() {
    let app = setup();
    app.state.store.set_slot_generating(2).await.unwrap();

    let (status, _) = make_request(&app.router, Method::GET, "/api/stream?track=2", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stream_out_of_range_is_bad_request() {
    let app = setup();

    let (status, body) = make_request(&app.router, Method::GET, "/api/stream?track=10", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body.unwrap()["error"]["code"], "SLOT_OUT_OF_RANGE");
}

#[tokio::test]
async fn test_stream_ready_slot_serves_audio() {
    // Given: slot 1 holds a payload
    let app = setup();
    publish_slot(&app.state, 1, b"ID3fake-mp3-bytes").await;

    // When
    let request = Request::builder()
        .uri("/api/stream?track=1")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    // Then: the raw bytes come back as audio/mpeg
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
    assert_eq!(response.headers()[header::ACCEPT_RANGES], "bytes");

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"ID3fake-mp3-bytes");
}

#[tokio::test]
async fn test_stream_honours_range_requests() {
    let app = setup();
    publish_slot(&app.state, 0, b"0123456789").await;

    let request = Request::builder()
        .uri("/api/stream?track=0")
        .header(header::RANGE, "bytes=2-5")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"2345");
}

#[tokio::test]
async fn test_stream_defaults_to_current_track() {
    let app = setup();
    publish_slot(&app.state, 1, b"current").await;
    app.state.scheduler.advance_now();

    let request = Request::builder()
        .uri("/api/stream")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"current");
}

#[tokio::test]
async fn test_update_prompt_stores_preference() {
    let app = setup();

    let (status, body) = make_request(
        &app.router,
        Method::POST,
        "/api/update-prompt",
        Some(json!({"mood": "lively", "instruments": "brass"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["mood"], "lively");
    assert_eq!(body["instruments"], "brass");

    let current = app.state.preferences.current().await;
    assert_eq!(current.mood, "lively");
    assert_eq!(current.instrument, "brass");
}

#[tokio::test]
async fn test_update_prompt_defaults_missing_fields() {
    let app = setup();

    let (status, body) =
        make_request(&app.router, Method::POST, "/api/update-prompt", Some(json!({}))).await;

    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["mood"], "neutral");
    assert_eq!(body["instruments"], "guitar");
}

#[tokio::test]
async fn test_update_prompt_non_string_mood_falls_back() {
    // Given: a previous preference
    let app = setup();
    app.state
        .preferences
        .update(lofai_radio::prompt::GenerationRequest::new("somber", "brass"))
        .await;

    // When: mood is a number
    let (status, body) = make_request(
        &app.router,
        Method::POST,
        "/api/update-prompt",
        Some(json!({"mood": 5, "instruments": "piano"})),
    )
    .await;

    // Then: accepted, with the default mood stored
    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["mood"], "neutral");
    assert_eq!(body["instruments"], "piano");

    let current = app.state.preferences.current().await;
    assert_eq!(current.mood, "neutral");
    assert_eq!(current.instrument, "piano");
}

#[tokio::test]
async fn test_update_prompt_null_fields_fall_back() {
    let app = setup();
    app.state
        .preferences
        .update(lofai_radio::prompt::GenerationRequest::new("lively", "brass"))
        .await;

    let (status, _) = make_request(
        &app.router,
        Method::POST,
        "/api/update-prompt",
        Some(json!({"mood": null, "instruments": null})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let current = app.state.preferences.current().await;
    assert_eq!(current.mood, "neutral");
    assert_eq!(current.instrument, "guitar");
}

#[tokio::test]
async fn test_update_prompt_array_instrument_falls_back() {
    let app = setup();

    let (status, body) = make_request(
        &app.router,
        Method::POST,
        "/api/update-prompt",
        Some(json!({"mood": "lively", "instruments": ["piano"]})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["mood"], "lively");
    assert_eq!(body["instruments"], "guitar");
}

#[tokio::test]
async fn test_next_track_advances_and_wraps() {
    let app = setup();

    let (status, body) = make_request(&app.router, Method::POST, "/api/next-track", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["track"], 1);

    for _ in 0..8 {
        make_request(&app.router, Method::POST, "/api/next-track", None).await;
    }
    let (_, body) = make_request(&app.router, Method::POST, "/api/next-track", None).await;
    assert_eq!(body.unwrap()["track"], 0);
}

#[tokio::test]
async fn test_rotation_lists_slot_states() {
    let app = setup();
    publish_slot(&app.state, 0, b"audio").await;
    app.state.store.set_slot_generating(1).await.unwrap();

    let (status, body) = make_request(&app.router, Method::GET, "/api/rotation", None).await;

    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["current_track"], 0);
    let slots = body["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 10);
    assert_eq!(slots[0]["status"], "ready");
    assert_eq!(slots[1]["status"], "generating");
    assert_eq!(slots[2]["status"], "empty");
}

#[tokio::test]
async fn test_generate_without_generator_is_not_queued() {
    let app = setup();

    let (status, body) = make_request(&app.router, Method::POST, "/api/generate", None).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    let body = body.unwrap();
    assert_eq!(body["queued"], false);
    assert_eq!(body["generator_ready"], false);
}

#[tokio::test]
async fn test_generate_queues_manual_batch() {
    let (queue, mut rx) = GenerationQueue::channel();
    let app = setup_with_queue(queue);

    let (status, body) = make_request(&app.router, Method::POST, "/api/generate", None).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body.unwrap()["queued"], true);
    assert_eq!(
        rx.try_recv().unwrap(),
        lofai_common::events::BatchTrigger::Manual
    );
}
