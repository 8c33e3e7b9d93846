//! Error types for lofai-radio
//!
//! Defines module-specific error types using thiserror, and maps them onto
//! HTTP responses for the API layer.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::synthesis::SynthesisError;

/// Main error type for lofai-radio
#[derive(Error, Debug)]
pub enum Error {
    /// Slot index outside the rotation
    #[error("Slot {index} out of range (rotation size {size})")]
    SlotOutOfRange { index: usize, size: usize },

    /// Requested slot has no committed audio yet
    #[error("Track {0} not yet generated")]
    NotYetAvailable(usize),

    /// Audio synthesis provider failure
    #[error("Synthesis error: {0}")]
    Synthesis(#[from] SynthesisError),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using lofai-radio Error
pub type Result<T> = std::result::Result<T, Error>;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Listeners polling an unready slot get a distinct, stable body
        if let Error::NotYetAvailable(track) = self {
            let body = Json(json!({
                "error": "Audio not yet generated",
                "track": track,
            }));
            return (StatusCode::NOT_FOUND, body).into_response();
        }

        let (status, error_code) = match &self {
            Error::SlotOutOfRange { .. } => (StatusCode::BAD_REQUEST, "SLOT_OUT_OF_RANGE"),
            Error::Synthesis(_) => (StatusCode::BAD_GATEWAY, "SYNTHESIS_ERROR"),
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
            Error::Internal(_) | Error::NotYetAvailable(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
