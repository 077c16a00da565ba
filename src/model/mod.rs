//! Generative model abstraction
//!
//! The pipeline talks to a model through [`GenerativeModel`]: a stateless,
//! single-shot call that turns an ordered list of parts into free-form text.

mod gemini;

pub use gemini::GeminiModel;

use async_trait::async_trait;

use crate::Result;

/// One element of a model prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    /// Inline audio with its MIME type
    Audio { data: Vec<u8>, mime_type: String },
    /// Instruction or context text
    Text(String),
}

/// Immutable, ordered prompt: at most one audio part followed by text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPrompt {
    parts: Vec<Part>,
}

impl ModelPrompt {
    /// Audio followed by a single instruction
    #[must_use]
    pub fn with_audio(data: Vec<u8>, mime_type: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            parts: vec![
                Part::Audio {
                    data,
                    mime_type: mime_type.into(),
                },
                Part::Text(instruction.into()),
            ],
        }
    }

    /// Text-only prompt
    #[must_use]
    pub fn text(instruction: impl Into<String>) -> Self {
        Self {
            parts: vec![Part::Text(instruction.into())],
        }
    }

    /// Parts in order
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Whether the prompt carries audio
    #[must_use]
    pub fn has_audio(&self) -> bool {
        self.parts.iter().any(|p| matches!(p, Part::Audio { .. }))
    }
}

/// A speech-capable generative model
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Run the prompt and return the model's raw text
    ///
    /// # Errors
    ///
    /// Returns `Error::Model` (or a transport error) if the call fails
    async fn generate(&self, prompt: &ModelPrompt) -> Result<String>;

    /// Model identifier for logs and the info endpoint
    fn model_id(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_prompt_order() {
        let prompt = ModelPrompt::with_audio(vec![1, 2, 3], "audio/wav", "transcribe");

        assert!(prompt.has_audio());
        assert_eq!(prompt.parts().len(), 2);
        assert!(matches!(&prompt.parts()[0], Part::Audio { mime_type, .. } if mime_type == "audio/wav"));
        assert_eq!(prompt.parts()[1], Part::Text("transcribe".to_string()));
    }

    #[test]
    fn test_text_prompt() {
        let prompt = ModelPrompt::text("hello");
        assert!(!prompt.has_audio());
        assert_eq!(prompt.parts(), &[Part::Text("hello".to_string())]);
    }
}
