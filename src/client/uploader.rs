//! Multipart upload of one audio file to the chat endpoint

use std::path::Path;

use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::api::chat::AUDIO_FIELD;
use crate::pipeline::ChatResult;
use crate::{Error, Result};

/// Error body returned by the chat endpoint
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    details: Option<String>,
}

/// Sends captured audio to a murmur server
#[derive(Debug, Clone)]
pub struct Uploader {
    client: reqwest::Client,
    base_url: String,
}

impl Uploader {
    /// Create an uploader for the server at `base_url`
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Upload an audio file and wait for the full result
    ///
    /// The MIME type is taken from `mime_type` or guessed from the extension.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, the request fails, or the
    /// server answers with an error payload
    pub async fn upload(&self, path: &Path, mime_type: Option<&str>) -> Result<ChatResult> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map_or_else(|| "audio.wav".to_string(), |n| n.to_string_lossy().into_owned());
        let mime_type = mime_type.unwrap_or_else(|| mime_for_path(path));

        self.upload_bytes(bytes, &file_name, mime_type).await
    }

    /// Upload in-memory audio
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the server answers with an error payload
    pub async fn upload_bytes(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        mime_type: &str,
    ) -> Result<ChatResult> {
        tracing::debug!(bytes = bytes.len(), file_name, mime_type, "uploading audio");

        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime_type)
            .map_err(|e| Error::Upload(e.to_string()))?;
        let form = Form::new().part(AUDIO_FIELD, part);

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upload(describe_failure(status, &body)));
        }

        Ok(response.json().await?)
    }

    /// Fetch the server's info descriptor
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the server is unhealthy
    pub async fn health(&self) -> Result<serde_json::Value> {
        let response = self
            .client
            .get(format!("{}/api/health", self.base_url))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Upload(format!("health check failed: {status}")));
        }

        Ok(response.json().await?)
    }
}

fn describe_failure(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            error,
            details: Some(details),
        }) => format!("{status}: {error} ({details})"),
        Ok(ErrorBody { error, details: None }) => format!("{status}: {error}"),
        Err(_) if body.is_empty() => status.to_string(),
        Err(_) => format!("{status}: {body}"),
    }
}

/// Guess a MIME type from a file extension, defaulting to WAV
#[must_use]
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "mp3" => "audio/mpeg",
        "m4a" | "mp4" => "audio/mp4",
        "ogg" | "opus" => "audio/ogg",
        "webm" => "audio/webm",
        "flac" => "audio/flac",
        "aac" => "audio/aac",
        "amr" => "audio/amr",
        "3gp" | "3gpp" => "audio/3gpp",
        _ => "audio/wav",
    }
}
