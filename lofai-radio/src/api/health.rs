//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Module name ("lofai-radio")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
    /// Index of the track currently on air
    pub current_track: usize,
    /// Sessions actively listening
    pub listeners: usize,
    /// Whether batch generation is available
    pub generator_ready: bool,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    Json(HealthResponse {
        status: "ok".to_string(),
        module: "lofai-radio".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        current_track: state.store.current_index(),
        listeners: state.presence.listener_count().await,
        generator_ready: state.generation.is_enabled(),
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
