//! Text-to-speech (TTS) for spoken replies

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use super::AudioPlayback;
use crate::client::Speaker;
use crate::config::ClientConfig;
use crate::{Error, Result};

/// Synthesizes speech with the `OpenAI` speech API
pub struct TextToSpeech {
    client: reqwest::Client,
    api_key: SecretString,
    voice: String,
    model: String,
}

impl TextToSpeech {
    /// Create a new TTS instance from client config
    ///
    /// # Errors
    ///
    /// Returns error if the `OpenAI` API key is missing
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let api_key = config
            .openai_api_key
            .as_ref()
            .map(|k| SecretString::from(k.expose_secret().to_string()))
            .ok_or_else(|| Error::Config("OPENAI_API_KEY required for TTS".to_string()))?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            voice: config.tts_voice.clone(),
            model: config.tts_model.clone(),
        })
    }

    /// Synthesize text to MP3 bytes
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
        }

        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/speech")
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("OpenAI TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        Ok(audio.to_vec())
    }
}

#[async_trait]
impl Speaker for TextToSpeech {
    async fn speak(&self, text: &str) -> Result<()> {
        let audio = self.synthesize(text).await?;
        tracing::debug!(bytes = audio.len(), "speaking reply");

        tokio::task::spawn_blocking(move || AudioPlayback::play_mp3(&audio))
            .await
            .map_err(|e| Error::Audio(format!("playback task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_api_key() {
        let config = ClientConfig {
            server_url: "http://localhost:3000".to_string(),
            openai_api_key: None,
            tts_voice: "alloy".to_string(),
            tts_model: "tts-1".to_string(),
        };
        assert!(matches!(
            TextToSpeech::from_config(&config),
            Err(Error::Config(_))
        ));
    }
}
