//! Google Gemini provider (Generative Language REST API)

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{GenerativeModel, ModelPrompt, Part};
use crate::config::ModelConfig;
use crate::{Error, Result};

/// Gemini `generateContent` client
pub struct GeminiModel {
    client: Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl GeminiModel {
    /// Create a new Gemini client
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing or the HTTP client cannot be built
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_ref()
            .map(|k| SecretString::from(k.expose_secret().to_string()))
            .ok_or_else(|| Error::Config("GOOGLE_API_KEY required for Gemini".to_string()))?;

        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            api_key,
            model: config.id.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl GenerativeModel for GeminiModel {
    async fn generate(&self, prompt: &ModelPrompt) -> Result<String> {
        let request = build_request(prompt);

        tracing::debug!(
            model = %self.model,
            parts = prompt.parts().len(),
            audio = prompt.has_audio(),
            "calling Gemini"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Gemini request failed");
                Error::Model(format!("Gemini request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Gemini API error");
            return Err(Error::Model(format!("Gemini API error {status}: {body}")));
        }

        let result: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| Error::Model(format!("failed to parse Gemini response: {e}")))?;

        response_text(result)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

fn build_request(prompt: &ModelPrompt) -> GenerateContentRequest {
    let parts = prompt
        .parts()
        .iter()
        .map(|part| match part {
            Part::Audio { data, mime_type } => RequestPart::InlineData {
                inline_data: InlineData {
                    mime_type: mime_type.clone(),
                    data: base64::engine::general_purpose::STANDARD.encode(data),
                },
            },
            Part::Text(text) => RequestPart::Text { text: text.clone() },
        })
        .collect();

    GenerateContentRequest {
        contents: vec![Content {
            role: "user",
            parts,
        }],
    }
}

/// Concatenate the text parts of the first candidate
fn response_text(response: GenerateContentResponse) -> Result<String> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(Error::Model(format!("Gemini returned no output: {reason}")));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    tracing::debug!(
        chars = text.len(),
        finish_reason = candidate.finish_reason.as_deref().unwrap_or("unknown"),
        "Gemini response received"
    );

    Ok(text)
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<RequestPart>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum RequestPart {
    InlineData { inline_data: InlineData },
    Text { text: String },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn config(api_key: Option<&str>) -> ModelConfig {
        ModelConfig {
            api_key: api_key.map(|k| SecretString::from(k.to_string())),
            id: "gemini-1.5-flash".to_string(),
            base_url: "https://example.test/v1beta/".to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_requires_api_key() {
        assert!(matches!(GeminiModel::new(&config(None)), Err(Error::Config(_))));
    }

    #[test]
    fn test_endpoint() {
        let model = GeminiModel::new(&config(Some("k"))).unwrap();
        assert_eq!(
            model.endpoint(),
            "https://example.test/v1beta/models/gemini-1.5-flash:generateContent"
        );
        assert_eq!(model.model_id(), "gemini-1.5-flash");
    }

    #[test]
    fn test_request_shape() {
        let prompt = ModelPrompt::with_audio(b"abc".to_vec(), "audio/wav", "transcribe");
        let json = serde_json::to_value(build_request(&prompt)).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        { "inline_data": { "mime_type": "audio/wav", "data": "YWJj" } },
                        { "text": "transcribe" }
                    ]
                }]
            })
        );
    }

    #[test]
    fn test_response_text_joins_parts() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Hello " }, { "text": "there" }] },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();

        assert_eq!(response_text(response).unwrap(), "Hello there");
    }

    #[test]
    fn test_blocked_prompt_is_model_error() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .unwrap();

        let err = response_text(response).unwrap_err();
        assert!(matches!(err, Error::Model(ref m) if m.contains("SAFETY")));
    }
}
