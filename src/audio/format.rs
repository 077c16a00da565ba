//! MIME normalization and container sniffing

/// Canonicalize a declared content type
///
/// Lowercases, drops parameters (`; codecs=...`) and folds common aliases.
#[must_use]
pub fn normalize_mime(declared: &str) -> String {
    let base = declared
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match base.as_str() {
        "" => super::DEFAULT_MIME.to_string(),
        "audio/x-wav" | "audio/wave" | "audio/vnd.wave" => "audio/wav".to_string(),
        "audio/mp3" | "audio/x-mp3" | "audio/mpeg3" => "audio/mpeg".to_string(),
        "audio/m4a" | "audio/x-m4a" => "audio/mp4".to_string(),
        "audio/x-flac" => "audio/flac".to_string(),
        _ => base,
    }
}

/// Whether a (normalized) MIME type names audio content
#[must_use]
pub fn is_audio_mime(mime_type: &str) -> bool {
    mime_type.starts_with("audio/")
}

/// File extension for scratch files
#[must_use]
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "audio/mpeg" => "mp3",
        "audio/mp4" => "m4a",
        "audio/webm" => "webm",
        "audio/ogg" | "audio/opus" => "ogg",
        "audio/flac" => "flac",
        "audio/aac" => "aac",
        "audio/amr" => "amr",
        "audio/3gpp" | "audio/3gpp2" => "3gp",
        _ => "wav",
    }
}

/// Identify the audio container from its leading bytes
///
/// Returns the canonical MIME type, or `None` if unrecognized.
#[must_use]
pub fn detect_format(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'A', b'V', b'E', ..] => Some("audio/wav"),
        [b'I', b'D', b'3', ..] => Some("audio/mpeg"),
        [b'O', b'g', b'g', b'S', ..] => Some("audio/ogg"),
        [0x1A, 0x45, 0xDF, 0xA3, ..] => Some("audio/webm"),
        [b'f', b'L', b'a', b'C', ..] => Some("audio/flac"),
        [b'#', b'!', b'A', b'M', b'R', ..] => Some("audio/amr"),
        [_, _, _, _, b'f', b't', b'y', b'p', ..] => Some("audio/mp4"),
        // Frame sync: layer bits 00 mean ADTS AAC, anything else is MPEG audio
        &[0xFF, second, ..] if second & 0xE0 == 0xE0 => {
            if (second >> 1) & 0x03 == 0 {
                Some("audio/aac")
            } else {
                Some("audio/mpeg")
            }
        }
        _ => None,
    }
}

/// Whether the content plausibly matches the declared type
///
/// Declared types with no known signature are trusted.
#[must_use]
pub fn matches_declared(declared: &str, bytes: &[u8]) -> bool {
    let expected: &[&str] = match declared {
        "audio/wav" => &["audio/wav"],
        "audio/mpeg" => &["audio/mpeg"],
        "audio/ogg" | "audio/opus" => &["audio/ogg"],
        "audio/webm" => &["audio/webm"],
        "audio/flac" => &["audio/flac"],
        "audio/amr" => &["audio/amr"],
        "audio/mp4" | "audio/3gpp" | "audio/3gpp2" => &["audio/mp4"],
        "audio/aac" => &["audio/aac", "audio/mp4"],
        _ => return true,
    };

    detect_format(bytes).is_some_and(|found| expected.contains(&found))
}
