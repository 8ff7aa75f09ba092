//! Validation of the backend's JSON payload.
//!
//! Shape produced by the backend:
//! - `{"error":false,"syncType":"...","lines":[{"startTimeMs":"...","words":"..."}]}`
//! - `{"error":true,"message":"..."}`
//!
//! Field access is lenient: a field of the wrong type is treated as missing.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::state::LyricLine;

/// Successfully parsed lyrics payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lyrics {
    pub sync_type: String,
    pub lines: Vec<LyricLine>,
}

/// Why a payload did not produce lyrics. The messages end up in the `error` field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("Empty response from lyrics backend")]
    Empty,

    #[error("Invalid JSON from lyrics backend")]
    InvalidJson,

    #[error("{0}")]
    Backend(String),
}

const DEFAULT_BACKEND_MESSAGE: &str = "Unknown error";

/// Parse a backend payload. `None` and an empty buffer are both empty responses.
///
/// # Errors
///
/// See [`ResolveError`] for the three failure shapes.
pub fn parse_payload(payload: Option<&[u8]>) -> Result<Lyrics, ResolveError> {
    let bytes = match payload {
        Some(bytes) if !bytes.is_empty() => bytes,
        _ => return Err(ResolveError::Empty),
    };

    let Ok(Value::Object(obj)) = serde_json::from_slice::<Value>(bytes) else {
        return Err(ResolveError::InvalidJson);
    };

    if obj.get("error").and_then(Value::as_bool).unwrap_or(false) {
        let message = obj
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_BACKEND_MESSAGE);
        return Err(ResolveError::Backend(message.to_string()));
    }

    let lines = obj
        .get("lines")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_object)
                .map(|line| LyricLine {
                    start_time_ms: string_field(line, "startTimeMs"),
                    words: string_field(line, "words"),
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(Lyrics {
        sync_type: string_field(&obj, "syncType"),
        lines,
    })
}

fn string_field(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(payload: &str) -> Result<Lyrics, ResolveError> {
        parse_payload(Some(payload.as_bytes()))
    }

    #[test]
    fn test_success_payload() {
        let lyrics = parse(
            r#"{"error":false,"syncType":"LINE_SYNCED","lines":[{"startTimeMs":"1000","words":"la la"}]}"#,
        )
        .unwrap();
        assert_eq!(lyrics.sync_type, "LINE_SYNCED");
        assert_eq!(lyrics.lines, vec![LyricLine::new("1000", "la la")]);
    }

    #[test]
    fn test_backend_error_with_message() {
        let err = parse(r#"{"error":true,"message":"no lyrics"}"#).unwrap_err();
        assert_eq!(err, ResolveError::Backend("no lyrics".into()));
        assert_eq!(err.to_string(), "no lyrics");
    }

    #[test]
    fn test_backend_error_without_message() {
        let err = parse(r#"{"error":true}"#).unwrap_err();
        assert_eq!(err.to_string(), "Unknown error");
    }

    #[test]
    fn test_empty_payload() {
        assert_eq!(parse_payload(Some(b"")), Err(ResolveError::Empty));
        assert_eq!(parse_payload(None), Err(ResolveError::Empty));
        assert_eq!(
            ResolveError::Empty.to_string(),
            "Empty response from lyrics backend"
        );
    }

    #[test]
    fn test_malformed_payload() {
        assert_eq!(parse("{not json"), Err(ResolveError::InvalidJson));
        assert_eq!(
            ResolveError::InvalidJson.to_string(),
            "Invalid JSON from lyrics backend"
        );
    }

    #[test]
    fn test_non_object_payload() {
        assert_eq!(parse("[1,2,3]"), Err(ResolveError::InvalidJson));
        assert_eq!(parse("\"text\""), Err(ResolveError::InvalidJson));
    }

    #[test]
    fn test_non_object_lines_are_skipped() {
        let lyrics = parse(
            r#"{"lines":[1,"x",{"startTimeMs":"500","words":""},null,{"words":"tail"}]}"#,
        )
        .unwrap();
        assert_eq!(
            lyrics.lines,
            vec![LyricLine::new("500", ""), LyricLine::new("", "tail")]
        );
        assert_eq!(lyrics.sync_type, "");
    }

    #[test]
    fn test_lenient_field_types() {
        // Non-boolean error flag counts as false, numeric start time as missing
        let lyrics = parse(
            r#"{"error":"yes","syncType":7,"lines":[{"startTimeMs":1000,"words":"w"}]}"#,
        )
        .unwrap();
        assert_eq!(lyrics.sync_type, "");
        assert_eq!(lyrics.lines, vec![LyricLine::new("", "w")]);
    }

    #[test]
    fn test_missing_lines_yields_empty() {
        let lyrics = parse(r#"{"error":false,"syncType":"UNSYNCED"}"#).unwrap();
        assert!(lyrics.lines.is_empty());
    }
}
