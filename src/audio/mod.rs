//! Uploaded audio payloads
//!
//! An [`AudioPayload`] owns a scratch file holding the raw uploaded bytes.
//! The file is unlinked when the payload is dropped, so every exit path of a
//! request releases its storage.

mod format;

use std::path::Path;

use tempfile::NamedTempFile;

pub use format::{detect_format, extension_for_mime, is_audio_mime, matches_declared, normalize_mime};

use crate::{Error, Result};

/// MIME type assumed when an upload does not declare one
pub const DEFAULT_MIME: &str = "audio/wav";

/// One request's audio, backed by a uniquely named scratch file
#[derive(Debug)]
pub struct AudioPayload {
    file: NamedTempFile,
    mime_type: String,
    len: usize,
}

impl AudioPayload {
    /// Write `bytes` to a fresh scratch file in `dir`
    ///
    /// The file is named `audio_<random>.<ext>` so concurrent requests never
    /// share a location.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAudio` if `bytes` is empty, or an IO error if the
    /// scratch file cannot be created or written
    pub async fn store(dir: &Path, bytes: &[u8], mime_type: Option<&str>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::InvalidAudio("empty audio data".to_string()));
        }

        let mime_type = mime_type.map_or_else(|| DEFAULT_MIME.to_string(), normalize_mime);
        let suffix = format!(".{}", extension_for_mime(&mime_type));

        let file = tempfile::Builder::new()
            .prefix("audio_")
            .suffix(&suffix)
            .tempfile_in(dir)?;
        tokio::fs::write(file.path(), bytes).await?;

        tracing::debug!(
            path = %file.path().display(),
            bytes = bytes.len(),
            mime_type = %mime_type,
            "stored audio payload"
        );

        Ok(Self {
            file,
            mime_type,
            len: bytes.len(),
        })
    }

    /// Declared (normalized) MIME type
    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Size of the stored audio in bytes
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the payload holds no bytes (never true for a stored payload)
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Location of the scratch file
    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Read the stored audio back from scratch storage
    ///
    /// # Errors
    ///
    /// Returns an IO error if the scratch file cannot be read
    pub async fn read(&self) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(self.file.path()).await?)
    }

    /// Check the stored bytes against the declared MIME type
    ///
    /// # Errors
    ///
    /// Returns `InvalidAudio` if the declared type is not audio or the magic
    /// bytes belong to a different container
    pub async fn validate(&self) -> Result<()> {
        if !is_audio_mime(&self.mime_type) {
            return Err(Error::InvalidAudio(format!(
                "declared type {} is not audio",
                self.mime_type
            )));
        }

        let bytes = self.read().await?;
        if matches_declared(&self.mime_type, &bytes) {
            Ok(())
        } else {
            let detected = detect_format(&bytes).unwrap_or("unknown");
            Err(Error::InvalidAudio(format!(
                "content looks like {detected}, declared {}",
                self.mime_type
            )))
        }
    }

    /// Delete the scratch file now, reporting any failure
    ///
    /// Dropping the payload also deletes the file but swallows errors.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file could not be removed
    pub fn release(self) -> Result<()> {
        let path = self.file.path().to_path_buf();
        self.file.close()?;
        tracing::debug!(path = %path.display(), "released audio payload");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAV_HEADER: &[u8] = b"RIFF\x24\x00\x00\x00WAVEfmt ";

    #[tokio::test]
    async fn test_store_writes_bytes_and_removes_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let payload = AudioPayload::store(dir.path(), WAV_HEADER, Some("audio/wav")).await.unwrap();
        let path = payload.path().to_path_buf();

        assert!(path.exists());
        assert_eq!(std::fs::read(&path).unwrap(), WAV_HEADER);
        assert_eq!(payload.len(), WAV_HEADER.len());
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("audio_"));
        assert_eq!(path.extension().unwrap(), "wav");

        drop(payload);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_release_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let payload = AudioPayload::store(dir.path(), WAV_HEADER, None).await.unwrap();
        let path = payload.path().to_path_buf();

        payload.release().unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_unique_names() {
        let dir = tempfile::tempdir().unwrap();
        let a = AudioPayload::store(dir.path(), WAV_HEADER, None).await.unwrap();
        let b = AudioPayload::store(dir.path(), WAV_HEADER, None).await.unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[tokio::test]
    async fn test_empty_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = AudioPayload::store(dir.path(), &[], None).await.unwrap_err();
        assert!(matches!(err, Error::InvalidAudio(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_store_large_payload_intact() {
        let dir = tempfile::tempdir().unwrap();
        let mut bytes = WAV_HEADER.to_vec();
        bytes.resize(2 * 1024 * 1024, 0x7f);

        let payload = AudioPayload::store(dir.path(), &bytes, None).await.unwrap();

        assert_eq!(payload.len(), bytes.len());
        assert_eq!(tokio::fs::read(payload.path()).await.unwrap(), bytes);
    }

    #[tokio::test]
    async fn test_store_into_missing_dir_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone");

        let err = AudioPayload::store(&missing, WAV_HEADER, None).await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[tokio::test]
    async fn test_missing_mime_defaults_to_wav() {
        let dir = tempfile::tempdir().unwrap();
        let payload = AudioPayload::store(dir.path(), WAV_HEADER, None).await.unwrap();
        assert_eq!(payload.mime_type(), DEFAULT_MIME);
    }

    #[tokio::test]
    async fn test_read_round_trips_through_scratch() {
        let dir = tempfile::tempdir().unwrap();
        let payload = AudioPayload::store(dir.path(), WAV_HEADER, None).await.unwrap();
        assert_eq!(payload.read().await.unwrap(), WAV_HEADER);
    }

    #[tokio::test]
    async fn test_validate() {
        let dir = tempfile::tempdir().unwrap();

        let ok = AudioPayload::store(dir.path(), WAV_HEADER, Some("audio/x-wav")).await.unwrap();
        assert!(ok.validate().await.is_ok());

        let lying = AudioPayload::store(dir.path(), b"OggS\x00\x02", Some("audio/wav")).await.unwrap();
        assert!(matches!(lying.validate().await, Err(Error::InvalidAudio(_))));

        let text = AudioPayload::store(dir.path(), b"hello", Some("text/plain")).await.unwrap();
        assert!(matches!(text.validate().await, Err(Error::InvalidAudio(_))));
    }
}
