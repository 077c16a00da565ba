//! Audio in, `{transcription, response}` out
//!
//! [`TranscribeAndRespond`] tries a single combined model call first. Only if
//! that call's output cannot be parsed does it fall back to two plain-text
//! calls (transcribe, then reply). Model failures at any stage abort the
//! request without further calls.

pub mod extract;
pub mod prompts;
mod strategy;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use extract::StructuredOutputMismatch;
pub use strategy::{AudioInput, CombinedOutcome, CombinedStrategy, FallbackStrategy};

use crate::audio::AudioPayload;
use crate::model::GenerativeModel;

/// Substituted when no transcription could be obtained
pub const DEFAULT_TRANSCRIPTION: &str = "Could not transcribe audio";

/// Substituted when no reply could be obtained
pub const DEFAULT_RESPONSE: &str = "I heard you! How can I help?";

/// Transcription and reply for one uploaded utterance
///
/// Both fields are always non-empty; construction substitutes defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ChatResultWire")]
pub struct ChatResult {
    transcription: String,
    response: String,
}

#[derive(Deserialize)]
struct ChatResultWire {
    #[serde(default)]
    transcription: Option<String>,
    #[serde(default)]
    response: Option<String>,
}

impl From<ChatResultWire> for ChatResult {
    fn from(wire: ChatResultWire) -> Self {
        Self::new(wire.transcription, wire.response)
    }
}

impl ChatResult {
    /// Build a result, filling missing or blank fields with defaults
    #[must_use]
    pub fn new(transcription: Option<String>, response: Option<String>) -> Self {
        Self {
            transcription: fill(transcription, DEFAULT_TRANSCRIPTION),
            response: fill(response, DEFAULT_RESPONSE),
        }
    }

    /// What the user said
    #[must_use]
    pub fn transcription(&self) -> &str {
        &self.transcription
    }

    /// The assistant's reply
    #[must_use]
    pub fn response(&self) -> &str {
        &self.response
    }
}

fn fill(value: Option<String>, default: &str) -> String {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => {
            tracing::debug!(default, "field missing, substituting default");
            default.to_string()
        }
    }
}

/// Which model call a failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Single call asking for transcription and reply as JSON
    Combined,
    /// Fallback transcribe-only call
    FallbackTranscribe,
    /// Fallback text-only reply call
    FallbackRespond,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Combined => "combined",
            Self::FallbackTranscribe => "fallback-transcribe",
            Self::FallbackRespond => "fallback-respond",
        })
    }
}

/// Reported pipeline failures
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The request itself is unusable; no model call was made
    #[error("{0}")]
    ClientInput(String),

    /// A model call failed; no further calls were attempted
    #[error("model call failed during {stage}: {cause}")]
    Upstream { stage: Stage, cause: String },

    /// Scratch storage could not be read
    #[error("storage error: {0}")]
    Storage(String),
}

/// Server-side handler for one audio payload
#[derive(Clone)]
pub struct TranscribeAndRespond {
    model: Arc<dyn GenerativeModel>,
    combined: CombinedStrategy,
    fallback: FallbackStrategy,
    validate_audio: bool,
}

impl TranscribeAndRespond {
    /// Create a handler backed by `model`
    #[must_use]
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self {
            model,
            combined: CombinedStrategy,
            fallback: FallbackStrategy,
            validate_audio: false,
        }
    }

    /// Check magic bytes against the declared MIME type before calling the model
    #[must_use]
    pub const fn validate_audio(mut self, enabled: bool) -> Self {
        self.validate_audio = enabled;
        self
    }

    /// Identifier of the underlying model
    #[must_use]
    pub fn model_id(&self) -> &str {
        self.model.model_id()
    }

    /// Turn one payload into a [`ChatResult`]
    ///
    /// The payload's scratch file is released before this returns, whichever
    /// path was taken.
    ///
    /// # Errors
    ///
    /// Returns `ClientInput` for rejected audio, `Upstream` if any model call
    /// fails, or `Storage` if the scratch file cannot be read
    pub async fn handle(&self, audio: AudioPayload) -> Result<ChatResult, PipelineError> {
        let outcome = self.run(&audio).await;

        if let Err(e) = audio.release() {
            tracing::warn!(error = %e, "failed to release audio payload");
        }

        outcome
    }

    async fn run(&self, audio: &AudioPayload) -> Result<ChatResult, PipelineError> {
        if self.validate_audio {
            audio
                .validate()
                .await
                .map_err(|e| PipelineError::ClientInput(e.to_string()))?;
        }

        let input = AudioInput {
            data: audio
                .read()
                .await
                .map_err(|e| PipelineError::Storage(e.to_string()))?,
            mime_type: audio.mime_type().to_string(),
        };

        tracing::info!(
            bytes = input.data.len(),
            mime_type = %input.mime_type,
            model = self.model.model_id(),
            "processing audio"
        );

        match self.combined.attempt(self.model.as_ref(), &input).await? {
            CombinedOutcome::Parsed(result) => Ok(result),
            CombinedOutcome::Mismatch(mismatch) => {
                tracing::warn!(reason = %mismatch, "combined output unparsable, using fallback");
                self.fallback.attempt(self.model.as_ref(), &input).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_result_defaults() {
        let result = ChatResult::new(None, Some(String::new()));
        assert_eq!(result.transcription(), DEFAULT_TRANSCRIPTION);
        assert_eq!(result.response(), DEFAULT_RESPONSE);
    }

    #[test]
    fn test_chat_result_trims() {
        let result = ChatResult::new(Some("  hi \n".to_string()), Some("hello".to_string()));
        assert_eq!(result.transcription(), "hi");
    }

    #[test]
    fn test_chat_result_json_shape() {
        let result = ChatResult::new(Some("hi".to_string()), Some("hello".to_string()));
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            serde_json::json!({ "transcription": "hi", "response": "hello" })
        );
    }

    #[test]
    fn test_chat_result_deserialize_fills_defaults() {
        let result: ChatResult = serde_json::from_str(r#"{"transcription":""}"#).unwrap();
        assert_eq!(result.transcription(), DEFAULT_TRANSCRIPTION);
        assert_eq!(result.response(), DEFAULT_RESPONSE);
    }

    #[test]
    fn test_upstream_error_message() {
        let err = PipelineError::Upstream {
            stage: Stage::FallbackRespond,
            cause: "quota exceeded".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "model call failed during fallback-respond: quota exceeded"
        );
    }
}
