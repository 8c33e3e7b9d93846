//! # lofai Radio Library (lofai-radio)
//!
//! Continuously-playing, AI-generated lofi radio.
//!
//! **Purpose:** Cycle a fixed rotation of generated tracks, regenerate the
//! rotation in the background as playback wraps around, and keep listeners
//! informed of how many peers are tuned in.
//!
//! **Architecture:**
//! - `rotation`: slot availability and the current playback index
//! - `prompt`: (mood, instrument) preference and prompt templates
//! - `synthesis`: text-to-audio provider seam and the fal.ai client
//! - `coordinator`: single-batch regeneration and the bounded generation queue
//! - `scheduler`: periodic advancement and wraparound triggers
//! - `presence`: listener sessions and count fan-out
//! - `api`: axum HTTP, WebSocket and SSE surface

pub mod api;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod presence;
pub mod prompt;
pub mod rotation;
pub mod scheduler;
pub mod synthesis;

pub use api::{build_router, AppState};
pub use error::{Error, Result};
