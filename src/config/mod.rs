//! Configuration management for the murmur gateway

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::{Error, Result};

/// Default generative model
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Default Google Generative Language REST endpoint
pub const DEFAULT_MODEL_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default API server port
pub const DEFAULT_PORT: u16 = 3000;

/// Murmur configuration
#[derive(Debug)]
pub struct Config {
    /// Generative model settings
    pub model: ModelConfig,

    /// HTTP API server settings
    pub server: ServerConfig,

    /// CLI client settings
    pub client: ClientConfig,
}

/// Generative model configuration
#[derive(Debug)]
pub struct ModelConfig {
    /// Google API key (from `GOOGLE_API_KEY`)
    pub api_key: Option<SecretString>,

    /// Model identifier
    pub id: String,

    /// REST base URL
    pub base_url: String,

    /// Transport timeout for a single model call
    pub timeout: Duration,
}

/// HTTP API server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,

    /// Directory for per-request audio scratch files
    pub scratch_dir: PathBuf,

    /// Maximum accepted upload size in bytes
    pub max_upload_bytes: usize,

    /// Global requests-per-minute limit; `None` disables rate limiting
    pub rate_limit_rpm: Option<u32>,

    /// Verify audio magic bytes before the first model call
    pub validate_audio: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            scratch_dir: std::env::temp_dir(),
            max_upload_bytes: 25 * 1024 * 1024,
            rate_limit_rpm: None,
            validate_audio: false,
        }
    }
}

/// CLI client configuration
#[derive(Debug)]
pub struct ClientConfig {
    /// Base URL of the chat server
    pub server_url: String,

    /// `OpenAI` API key, used to speak replies
    pub openai_api_key: Option<SecretString>,

    /// TTS voice identifier
    pub tts_voice: String,

    /// TTS model
    pub tts_model: String,
}

impl Config {
    /// Load configuration from the environment and the TOML config file
    ///
    /// Precedence: env > toml > default
    ///
    /// # Errors
    ///
    /// Returns error if a value is present but malformed
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();
        Self::from_sources(fc, |key| std::env::var(key).ok())
    }

    /// Build configuration from a parsed config file and an env lookup
    ///
    /// # Errors
    ///
    /// Returns error if a value is present but malformed
    pub fn from_sources(
        fc: file::MurmurConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let timeout_secs = match env("MURMUR_MODEL_TIMEOUT_SECS") {
            Some(raw) => parse_env("MURMUR_MODEL_TIMEOUT_SECS", &raw)?,
            None => fc.model.timeout_secs.unwrap_or(60),
        };

        let model = ModelConfig {
            api_key: env("GOOGLE_API_KEY")
                .or(fc.model.api_key)
                .filter(|k| !k.is_empty())
                .map(SecretString::from),
            id: env("MURMUR_MODEL")
                .or(fc.model.id)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: env("MURMUR_MODEL_BASE_URL")
                .or(fc.model.base_url)
                .unwrap_or_else(|| DEFAULT_MODEL_BASE_URL.to_string()),
            timeout: Duration::from_secs(timeout_secs),
        };

        let defaults = ServerConfig::default();

        let port = match env("MURMUR_PORT").or_else(|| env("PORT")) {
            Some(raw) => parse_env("MURMUR_PORT", &raw)?,
            None => fc.server.port.unwrap_or(defaults.port),
        };

        let rate_limit_rpm = match env("MURMUR_RATE_LIMIT_RPM") {
            Some(raw) => Some(parse_env("MURMUR_RATE_LIMIT_RPM", &raw)?),
            None => fc.server.rate_limit_rpm,
        };

        let validate_audio = match env("MURMUR_VALIDATE_AUDIO") {
            Some(raw) => parse_bool("MURMUR_VALIDATE_AUDIO", &raw)?,
            None => fc.server.validate_audio.unwrap_or(defaults.validate_audio),
        };

        let server = ServerConfig {
            port,
            scratch_dir: env("MURMUR_SCRATCH_DIR")
                .or(fc.server.scratch_dir)
                .map_or(defaults.scratch_dir, PathBuf::from),
            max_upload_bytes: fc.server.max_upload_bytes.unwrap_or(defaults.max_upload_bytes),
            rate_limit_rpm,
            validate_audio,
        };

        let client = ClientConfig {
            server_url: env("MURMUR_SERVER_URL")
                .or(fc.client.server_url)
                .unwrap_or_else(|| format!("http://localhost:{DEFAULT_PORT}")),
            openai_api_key: env("OPENAI_API_KEY")
                .or(fc.client.openai_api_key)
                .filter(|k| !k.is_empty())
                .map(SecretString::from),
            tts_voice: fc.client.tts_voice.unwrap_or_else(|| "alloy".to_string()),
            tts_model: fc.client.tts_model.unwrap_or_else(|| "tts-1".to_string()),
        };

        Ok(Self {
            model,
            server,
            client,
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| Error::Config(format!("{key}: cannot parse {raw:?}")))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(Error::Config(format!("{key}: expected a boolean, got {raw:?}"))),
    }
}
