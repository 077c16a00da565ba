//! TOML configuration file loading
//!
//! Supports `~/.config/murmur/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct MurmurConfigFile {
    /// Generative model configuration
    #[serde(default)]
    pub model: ModelFileConfig,

    /// Server/runtime configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// CLI client configuration
    #[serde(default)]
    pub client: ClientFileConfig,
}

/// Generative model configuration
#[derive(Debug, Default, Deserialize)]
pub struct ModelFileConfig {
    /// Google Generative Language API key
    pub api_key: Option<String>,

    /// Model identifier (e.g. "gemini-1.5-flash")
    pub id: Option<String>,

    /// REST base URL
    pub base_url: Option<String>,

    /// Per-call transport timeout
    pub timeout_secs: Option<u64>,
}

/// Server/runtime configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// API server port
    pub port: Option<u16>,

    /// Directory for per-request audio scratch files
    pub scratch_dir: Option<String>,

    /// Maximum accepted upload size in bytes
    pub max_upload_bytes: Option<usize>,

    /// Requests per minute across the whole server
    pub rate_limit_rpm: Option<u32>,

    /// Check audio magic bytes against the declared MIME type
    pub validate_audio: Option<bool>,
}

/// CLI client configuration
#[derive(Debug, Default, Deserialize)]
pub struct ClientFileConfig {
    /// Base URL of the chat server
    pub server_url: Option<String>,

    /// `OpenAI` key for speaking replies
    pub openai_api_key: Option<String>,

    /// TTS voice identifier (e.g. "alloy")
    pub tts_voice: Option<String>,

    /// TTS model (e.g. "tts-1")
    pub tts_model: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `MurmurConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> MurmurConfigFile {
    config_file_path().map_or_else(MurmurConfigFile::default, |path| load_config_from(&path))
}

/// Load a TOML config file from an explicit path
pub fn load_config_from(path: &Path) -> MurmurConfigFile {
    if !path.exists() {
        return MurmurConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                MurmurConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            MurmurConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/murmur/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("murmur").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_parses() {
        let fc: MurmurConfigFile = toml::from_str(
            r#"
            [model]
            id = "gemini-2.0-flash"

            [server]
            port = 8080
            validate_audio = true
            "#,
        )
        .unwrap();

        assert_eq!(fc.model.id.as_deref(), Some("gemini-2.0-flash"));
        assert!(fc.model.api_key.is_none());
        assert_eq!(fc.server.port, Some(8080));
        assert_eq!(fc.server.validate_audio, Some(true));
        assert!(fc.client.server_url.is_none());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let fc = load_config_from(&dir.path().join("nope.toml"));
        assert!(fc.server.port.is_none());
    }

    #[test]
    fn test_broken_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server\nport = ").unwrap();

        let fc = load_config_from(&path);
        assert!(fc.server.port.is_none());
    }
}
