//! Audio chat endpoint
//!
//! `POST /api/chat` takes a multipart body with one part named `audio` and
//! answers `{transcription, response}`.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Multipart, State, multipart::MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Serialize;

use super::{ApiState, health};
use crate::Error;
use crate::audio::AudioPayload;
use crate::pipeline::{ChatResult, PipelineError};

/// Multipart field carrying the audio file
pub const AUDIO_FIELD: &str = "audio";

/// Build chat router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/chat", post(chat).get(health::info))
        .with_state(state)
}

/// Transcribe uploaded audio and reply to it
#[tracing::instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4()))]
async fn chat(
    State(state): State<Arc<ApiState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ChatResult>, ChatError> {
    let mut multipart = multipart.map_err(|e| ChatError::BadRequest(e.body_text()))?;

    let Some((bytes, content_type)) = read_audio_field(&mut multipart).await? else {
        return Err(ChatError::BadRequest("No audio file provided".to_string()));
    };

    let payload = AudioPayload::store(&state.scratch_dir, &bytes, content_type.as_deref())
        .await
        .map_err(|e| match e {
            Error::InvalidAudio(msg) => ChatError::BadRequest(msg),
            other => ChatError::Internal(other.to_string()),
        })?;

    let result = state.pipeline.handle(payload).await?;

    tracing::info!(
        transcription = %result.transcription(),
        response = %result.response(),
        "chat request complete"
    );

    Ok(Json(result))
}

/// Pull the first `audio` part, skipping anything else
async fn read_audio_field(
    multipart: &mut Multipart,
) -> Result<Option<(axum::body::Bytes, Option<String>)>, ChatError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(AUDIO_FIELD) {
            tracing::debug!(name = ?field.name(), "ignoring multipart field");
            continue;
        }

        let content_type = field
            .content_type()
            .filter(|ct| *ct != "application/octet-stream")
            .map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;

        return Ok(Some((bytes, content_type)));
    }

    Ok(None)
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> ChatError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ChatError::TooLarge
    } else {
        ChatError::BadRequest(e.body_text())
    }
}

/// Chat API errors
#[derive(Debug)]
pub enum ChatError {
    BadRequest(String),
    TooLarge,
    Upstream(String),
    Internal(String),
}

impl From<PipelineError> for ChatError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::ClientInput(msg) => Self::BadRequest(msg),
            PipelineError::Upstream { .. } => Self::Upstream(e.to_string()),
            PipelineError::Storage(msg) => Self::Internal(msg),
        }
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            details: Option<String>,
        }

        let (status, error, details) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            Self::TooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "Audio file too large".to_string(),
                None,
            ),
            Self::Upstream(cause) | Self::Internal(cause) => {
                tracing::error!(cause = %cause, "error processing request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to process audio".to_string(),
                    Some(cause),
                )
            }
        };

        (status, Json(ErrorResponse { error, details })).into_response()
    }
}
