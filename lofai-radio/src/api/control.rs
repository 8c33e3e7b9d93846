//! Rotation control endpoints
//!
//! POST /api/update-prompt, POST /api/next-track, POST /api/generate,
//! GET /api/rotation

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use lofai_common::events::{BatchTrigger, RadioEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::prompt::{GenerationRequest, DEFAULT_INSTRUMENT, DEFAULT_MOOD};
use crate::rotation::SlotStatus;
use crate::AppState;

/// POST /api/update-prompt request
///
/// Fields are taken as raw JSON so that a missing, null or non-string value
/// degrades to the default instead of rejecting the request.
#[derive(Debug, Deserialize)]
pub struct UpdatePromptRequest {
    #[serde(default)]
    pub mood: Option<Value>,
    #[serde(default, alias = "instrument")]
    pub instruments: Option<Value>,
}

impl UpdatePromptRequest {
    /// Preference to store; anything but a string becomes the default
    pub fn into_preference(self) -> GenerationRequest {
        GenerationRequest::new(
            string_or(self.mood, DEFAULT_MOOD.as_str()),
            string_or(self.instruments, DEFAULT_INSTRUMENT.as_str()),
        )
    }
}

fn string_or(value: Option<Value>, default: &str) -> String {
    match value {
        Some(Value::String(s)) => s,
        _ => default.to_string(),
    }
}

/// POST /api/update-prompt response
#[derive(Debug, Serialize)]
pub struct UpdatePromptResponse {
    pub status: String,
    pub mood: String,
    pub instruments: String,
}

/// POST /api/next-track response
#[derive(Debug, Serialize)]
pub struct NextTrackResponse {
    pub track: usize,
}

/// POST /api/generate response
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub queued: bool,
    pub generator_ready: bool,
}

/// GET /api/rotation response
#[derive(Debug, Serialize)]
pub struct RotationResponse {
    pub current_track: usize,
    pub slots: Vec<SlotInfo>,
}

#[derive(Debug, Serialize)]
pub struct SlotInfo {
    pub index: usize,
    pub status: SlotStatus,
}

/// POST /api/update-prompt
///
/// Replaces the generation preference. Unknown strings are stored as given
/// and fall back to the default template when the next batch is built;
/// null or non-string fields are stored as the defaults.
pub async fn update_prompt(
    State(state): State<AppState>,
    Json(request): Json<UpdatePromptRequest>,
) -> Json<UpdatePromptResponse> {
    let preference = request.into_preference();
    state.preferences.update(preference.clone()).await;

    tracing::info!(mood = %preference.mood, instrument = %preference.instrument, "Prompt preference updated");
    state.event_bus.emit_lossy(RadioEvent::PromptUpdated {
        mood: preference.mood.clone(),
        instrument: preference.instrument.clone(),
        timestamp: Utc::now(),
    });

    Json(UpdatePromptResponse {
        status: "ok".to_string(),
        mood: preference.mood,
        instruments: preference.instrument,
    })
}

/// POST /api/next-track
pub async fn next_track(State(state): State<AppState>) -> Json<NextTrackResponse> {
    let track = state.scheduler.advance_now();
    Json(NextTrackResponse { track })
}

/// POST /api/generate
///
/// Queues a full regeneration. Returns 202 Accepted without waiting.
pub async fn generate(State(state): State<AppState>) -> (StatusCode, Json<GenerateResponse>) {
    let queued = state.generation.request_batch(BatchTrigger::Manual);
    (
        StatusCode::ACCEPTED,
        Json(GenerateResponse {
            queued,
            generator_ready: state.generation.is_enabled(),
        }),
    )
}

/// GET /api/rotation
pub async fn rotation_status(State(state): State<AppState>) -> Json<RotationResponse> {
    let slots = state
        .store
        .snapshot()
        .await
        .into_iter()
        .map(|slot| SlotInfo {
            index: slot.index,
            status: slot.status,
        })
        .collect();

    Json(RotationResponse {
        current_track: state.store.current_index(),
        slots,
    })
}

pub fn control_routes() -> Router<AppState> {
    Router::new()
        .route("/api/update-prompt", post(update_prompt))
        .route("/api/next-track", post(next_track))
        .route("/api/generate", post(generate))
        .route("/api/rotation", get(rotation_status))
}
