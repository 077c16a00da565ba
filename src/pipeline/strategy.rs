//! Primary and fallback attempts
//!
//! Each attempt owns its prompts and its output handling. Model failures
//! surface as [`PipelineError::Upstream`]; only the combined attempt can
//! report a structured-output mismatch.

use super::extract::{self, StructuredOutputMismatch};
use super::{ChatResult, PipelineError, Stage, prompts};
use crate::model::{GenerativeModel, ModelPrompt};

/// Audio handed to the model, read back from scratch storage
#[derive(Debug, Clone)]
pub struct AudioInput {
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// Result of the combined call
#[derive(Debug)]
pub enum CombinedOutcome {
    /// Output parsed into a full result
    Parsed(ChatResult),
    /// Output could not be parsed; the fallback should run
    Mismatch(StructuredOutputMismatch),
}

/// Single call asking for transcription and reply as one JSON object
#[derive(Debug, Default, Clone, Copy)]
pub struct CombinedStrategy;

impl CombinedStrategy {
    /// Run the combined call
    ///
    /// # Errors
    ///
    /// Returns `Upstream` if the model call fails
    pub async fn attempt(
        self,
        model: &dyn GenerativeModel,
        audio: &AudioInput,
    ) -> Result<CombinedOutcome, PipelineError> {
        let prompt = ModelPrompt::with_audio(
            audio.data.clone(),
            audio.mime_type.clone(),
            prompts::COMBINED_INSTRUCTION,
        );

        let raw = invoke(model, &prompt, Stage::Combined).await?;
        tracing::debug!(raw = %raw, "combined call output");

        Ok(match extract::extract(&raw) {
            Ok(result) => CombinedOutcome::Parsed(result),
            Err(mismatch) => CombinedOutcome::Mismatch(mismatch),
        })
    }
}

/// Transcribe-only call followed by a text-only reply call
///
/// Both outputs are used verbatim (trimmed), so this strategy has no
/// parse-failure mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackStrategy;

impl FallbackStrategy {
    /// Run both fallback calls in order
    ///
    /// # Errors
    ///
    /// Returns `Upstream` if either model call fails; the reply call is not
    /// made when transcription fails
    pub async fn attempt(
        self,
        model: &dyn GenerativeModel,
        audio: &AudioInput,
    ) -> Result<ChatResult, PipelineError> {
        let prompt = ModelPrompt::with_audio(
            audio.data.clone(),
            audio.mime_type.clone(),
            prompts::TRANSCRIBE_ONLY_INSTRUCTION,
        );
        let transcription = invoke(model, &prompt, Stage::FallbackTranscribe)
            .await?
            .trim()
            .to_string();
        tracing::debug!(transcription = %transcription, "fallback transcription");

        let prompt = ModelPrompt::text(prompts::respond_to(&transcription));
        let response = invoke(model, &prompt, Stage::FallbackRespond)
            .await?
            .trim()
            .to_string();
        tracing::debug!(response = %response, "fallback response");

        Ok(ChatResult::new(Some(transcription), Some(response)))
    }
}

async fn invoke(
    model: &dyn GenerativeModel,
    prompt: &ModelPrompt,
    stage: Stage,
) -> Result<String, PipelineError> {
    model.generate(prompt).await.map_err(|e| {
        tracing::error!(stage = %stage, error = %e, "model call failed");
        PipelineError::Upstream {
            stage,
            cause: e.to_string(),
        }
    })
}
