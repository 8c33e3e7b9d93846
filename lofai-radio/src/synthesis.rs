//! Audio synthesis client
//!
//! `AudioSynthesizer` is the seam between the regeneration coordinator and
//! the text-to-audio provider. `FalMusicGenClient` implements it against the
//! fal.ai MusicGen endpoint: one POST to generate, then a download of the
//! audio URL found in the response.

use async_trait::async_trait;
use lofai_common::config::SynthesisSettings;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("lofai-radio/", env!("CARGO_PKG_VERSION"));

/// Synthesis client errors
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("No audio URL found. Available keys: {0:?}")]
    MissingAudioUrl(Vec<String>),

    #[error("Download failed: {0}")]
    Download(String),
}

/// Text-to-audio provider
#[async_trait]
pub trait AudioSynthesizer: Send + Sync {
    /// Provider identifier for logging
    fn provider_name(&self) -> &'static str;

    /// Generate one clip for the prompt and return its encoded bytes
    async fn synthesize(&self, prompt: &str) -> Result<Vec<u8>, SynthesisError>;
}

/// MusicGen request body
#[derive(Debug, Serialize)]
struct MusicGenRequest<'a> {
    prompt: &'a str,
    model_version: &'a str,
    duration: u32,
    output_format: &'a str,
}

/// fal.ai MusicGen client
pub struct FalMusicGenClient {
    http_client: reqwest::Client,
    api_key: String,
    settings: SynthesisSettings,
}

impl FalMusicGenClient {
    pub fn new(api_key: String, settings: SynthesisSettings) -> Result<Self, SynthesisError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SynthesisError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
            settings,
        })
    }

    /// Submit the generation request and return the provider's JSON response
    async fn request_generation(&self, prompt: &str) -> Result<Value, SynthesisError> {
        let body = MusicGenRequest {
            prompt,
            model_version: &self.settings.model_version,
            duration: self.settings.duration_secs,
            output_format: "mp3",
        };

        tracing::debug!(endpoint = %self.settings.endpoint, "Requesting MusicGen clip");

        let response = self
            .http_client
            .post(&self.settings.endpoint)
            .header(reqwest::header::AUTHORIZATION, format!("Key {}", self.api_key))
            .timeout(Duration::from_secs(self.settings.request_timeout_secs))
            .json(&body)
            .send()
            .await
            .map_err(|e| SynthesisError::Network(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(SynthesisError::InvalidApiKey);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SynthesisError::Api(status.as_u16(), error_text));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| SynthesisError::MalformedResponse(e.to_string()))
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, SynthesisError> {
        let response = self
            .http_client
            .get(url)
            .timeout(Duration::from_secs(self.settings.download_timeout_secs))
            .send()
            .await
            .map_err(|e| SynthesisError::Download(e.to_string()))?;

        let response = response
            .error_for_status()
            .map_err(|e| SynthesisError::Download(e.to_string()))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SynthesisError::Download(e.to_string()))?;

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl AudioSynthesizer for FalMusicGenClient {
    fn provider_name(&self) -> &'static str {
        "fal-ai/musicgen"
    }

    async fn synthesize(&self, prompt: &str) -> Result<Vec<u8>, SynthesisError> {
        let result = self.request_generation(prompt).await?;
        let audio_url = extract_audio_url(&result)?;

        tracing::debug!(url = %audio_url, "Downloading generated clip");
        self.download(&audio_url).await
    }
}

/// Locate the audio URL in a MusicGen response
///
/// Accepted shapes, checked in order:
/// `audio_url`, `audio_file`, `url`, `data.audio_file`, `data.url`,
/// where file entries may be a bare string or an object with `url`.
pub fn extract_audio_url(result: &Value) -> Result<String, SynthesisError> {
    let object = result.as_object().ok_or_else(|| {
        SynthesisError::MalformedResponse("Invalid response format: expected JSON object".to_string())
    })?;

    let url = if let Some(entry) = object.get("audio_url") {
        url_of(entry)
    } else if let Some(entry) = object.get("audio_file") {
        url_of(entry)
    } else if let Some(entry) = object.get("url") {
        entry.as_str().map(str::to_string)
    } else if let Some(data) = object.get("data").and_then(Value::as_object) {
        if let Some(entry) = data.get("audio_file") {
            url_of(entry)
        } else {
            data.get("url").and_then(Value::as_str).map(str::to_string)
        }
    } else {
        None
    };

    match url {
        Some(url) if !url.is_empty() => Ok(url),
        _ => Err(SynthesisError::MissingAudioUrl(object.keys().cloned().collect())),
    }
}

/// A file entry is either `"https://..."` or `{"url": "https://..."}`
fn url_of(entry: &Value) -> Option<String> {
    match entry {
        Value::String(url) => Some(url.clone()),
        Value::Object(map) => map.get("url").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}
