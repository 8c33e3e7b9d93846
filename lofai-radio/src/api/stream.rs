//! Track streaming endpoint
//!
//! GET /api/stream?track=N serves a Ready slot's payload with byte-range
//! support. Slots that are Empty or Generating answer 404 "not yet generated".

use axum::{
    body::Body,
    extract::{Query, Request, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::error::{Error, Result};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    /// Slot to serve (default: current track)
    pub track: Option<usize>,
}

/// GET /api/stream
pub async fn stream_track(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
    request: Request,
) -> Result<Response> {
    let track = query.track.unwrap_or_else(|| state.store.current_index());
    state.store.check_index(track)?;

    let path = state.store.ready_path(track).await?;
    tracing::debug!(track, path = %path.display(), "Streaming track");

    // Content type is derived from the .mp3 extension
    let response = ServeFile::new(&path)
        .oneshot(request)
        .await
        .map_err(|e| Error::Internal(format!("serve {}: {}", path.display(), e)))?;

    let mut response = response.map(Body::new).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    Ok(response)
}

pub fn stream_routes() -> Router<AppState> {
    Router::new().route("/api/stream", get(stream_track))
}
