//! Locating and validating the JSON object in combined-call output
//!
//! Two patterns are tried in order: a fenced code block (optionally tagged
//! `json`) wrapping an object, then the widest bare `{...}` span. The matched
//! text must parse as a JSON object whose `transcription` and `response`
//! members, when present, are strings. At least one of the two must be present.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use super::ChatResult;

static FENCED_OBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```(?:json)?\s*(\{[\s\S]*\})\s*```").expect("valid regex")
});

static BARE_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[\s\S]*\}").expect("valid regex"));

/// Combined-call output could not be turned into a [`ChatResult`]
#[derive(Debug, Error)]
pub enum StructuredOutputMismatch {
    /// No fenced or bare object in the text
    #[error("no JSON object found in model output")]
    NoObject,

    /// Candidate text is not valid JSON
    #[error("invalid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// Valid JSON, wrong shape
    #[error("unexpected shape: {0}")]
    Schema(String),
}

#[derive(Deserialize)]
struct CombinedOutput {
    #[serde(default)]
    transcription: Option<String>,
    #[serde(default)]
    response: Option<String>,
}

/// Find the candidate object text in raw model output
#[must_use]
pub fn find_object(raw: &str) -> Option<&str> {
    FENCED_OBJECT
        .captures(raw)
        .and_then(|c| c.get(1))
        .or_else(|| BARE_OBJECT.find(raw))
        .map(|m| m.as_str())
}

/// Extract a [`ChatResult`] from raw combined-call output
///
/// Missing or empty fields are filled with defaults.
///
/// # Errors
///
/// Returns a [`StructuredOutputMismatch`] when no object is found, the JSON is
/// invalid, or the object does not have the expected string fields
pub fn extract(raw: &str) -> Result<ChatResult, StructuredOutputMismatch> {
    let candidate = find_object(raw).ok_or(StructuredOutputMismatch::NoObject)?;

    let value: serde_json::Value =
        serde_json::from_str(candidate).map_err(StructuredOutputMismatch::InvalidJson)?;

    let Some(object) = value.as_object() else {
        return Err(StructuredOutputMismatch::Schema("not an object".to_string()));
    };
    if !object.contains_key("transcription") && !object.contains_key("response") {
        return Err(StructuredOutputMismatch::Schema(
            "neither transcription nor response present".to_string(),
        ));
    }

    let output: CombinedOutput = serde_json::from_value(value)
        .map_err(|e| StructuredOutputMismatch::Schema(e.to_string()))?;

    Ok(ChatResult::new(output.transcription, output.response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{DEFAULT_RESPONSE, DEFAULT_TRANSCRIPTION};

    #[test]
    fn test_fenced_json_block() {
        let raw = "```json\n{\"transcription\":\"hi\",\"response\":\"hello\"}\n```";
        let result = extract(raw).unwrap();
        assert_eq!(result.transcription(), "hi");
        assert_eq!(result.response(), "hello");
    }

    #[test]
    fn test_untagged_fence() {
        let raw = "Sure!\n```\n{\"transcription\":\"hi\",\"response\":\"hello\"}\n```\nDone.";
        assert_eq!(find_object(raw), Some("{\"transcription\":\"hi\",\"response\":\"hello\"}"));
    }

    #[test]
    fn test_bare_object() {
        let raw = "{\"transcription\":\"hi\",\"response\":\"hello\"}";
        let result = extract(raw).unwrap();
        assert_eq!(result.transcription(), "hi");
        assert_eq!(result.response(), "hello");
    }

    #[test]
    fn test_bare_object_with_surrounding_prose() {
        let raw = "Here you go: {\"transcription\": \"good morning\", \"response\": \"Morning!\"} hope that helps";
        let result = extract(raw).unwrap();
        assert_eq!(result.transcription(), "good morning");
        assert_eq!(result.response(), "Morning!");
    }

    #[test]
    fn test_nested_braces_in_values() {
        let raw = "{\"transcription\":\"say {x}\",\"response\":\"ok\"}";
        assert_eq!(extract(raw).unwrap().transcription(), "say {x}");
    }

    #[test]
    fn test_prose_is_mismatch() {
        let err = extract("I could not understand the audio, sorry.").unwrap_err();
        assert!(matches!(err, StructuredOutputMismatch::NoObject));
    }

    #[test]
    fn test_broken_json_is_mismatch() {
        let err = extract("{\"transcription\": \"hi\", \"response\": }").unwrap_err();
        assert!(matches!(err, StructuredOutputMismatch::InvalidJson(_)));
    }

    #[test]
    fn test_wrong_field_type_is_mismatch() {
        let err = extract("{\"transcription\": 42, \"response\": \"ok\"}").unwrap_err();
        assert!(matches!(err, StructuredOutputMismatch::Schema(_)));
    }

    #[test]
    fn test_unrelated_object_is_mismatch() {
        let err = extract("{\"text\": \"hi\"}").unwrap_err();
        assert!(matches!(err, StructuredOutputMismatch::Schema(_)));
    }

    #[test]
    fn test_empty_transcription_gets_default() {
        let result = extract("{\"transcription\":\"\", \"response\":\"ok\"}").unwrap();
        assert_eq!(result.transcription(), DEFAULT_TRANSCRIPTION);
        assert_eq!(result.response(), "ok");
    }

    #[test]
    fn test_missing_and_null_fields_get_defaults() {
        let result = extract("{\"transcription\":\"hi\"}").unwrap();
        assert_eq!(result.response(), DEFAULT_RESPONSE);

        let result = extract("{\"transcription\":null,\"response\":\"  \"}").unwrap();
        assert_eq!(result.transcription(), DEFAULT_TRANSCRIPTION);
        assert_eq!(result.response(), DEFAULT_RESPONSE);
    }
}
