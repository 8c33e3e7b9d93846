//! HTTP API for lofai-radio
//!
//! REST endpoints for streaming and control, a WebSocket for listener
//! presence, and an SSE stream of radio events.

pub mod control;
pub mod health;
pub mod sse;
pub mod stream;
pub mod ws;

use axum::{
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use lofai_common::events::EventBus;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::coordinator::GenerationQueue;
use crate::presence::PresenceBroadcaster;
use crate::prompt::PreferenceStore;
use crate::rotation::RotationStore;
use crate::scheduler::PlaybackScheduler;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RotationStore>,
    pub preferences: Arc<PreferenceStore>,
    pub scheduler: Arc<PlaybackScheduler>,
    pub generation: GenerationQueue,
    pub presence: Arc<PresenceBroadcaster>,
    pub event_bus: EventBus,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        store: Arc<RotationStore>,
        preferences: Arc<PreferenceStore>,
        scheduler: Arc<PlaybackScheduler>,
        generation: GenerationQueue,
        presence: Arc<PresenceBroadcaster>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            store,
            preferences,
            scheduler,
            generation,
            presence,
            event_bus,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(stream::stream_routes())
        .merge(control::control_routes())
        .merge(health::health_routes())
        .route("/ws", get(ws::listener_socket))
        .route("/events", get(sse::event_stream))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS layer for the browser frontend
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin {:?}: {}", origin, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE])
        .allow_credentials(true)
}
