//! Repair-then-parse for unreliable oracle output.
//!
//! The oracle response is treated as an untyped string. Parsing locates
//! the outermost `{...}` span and attempts a strict parse; on failure it
//! applies exactly two deterministic rewrites and retries once:
//!
//! 1. Array values under fields known to be scalar strings are collapsed
//!    into comma-joined strings (models love returning `["a", "b"]` where
//!    a single string was asked for).
//! 2. Trailing commas before closing braces and brackets are stripped.
//!
//! If the retry also fails, the result is a typed error the caller must
//! treat as "this sample is unusable", never as a pipeline-fatal fault.

use regex::Regex;
use serde_json::Value;

use crate::error::{Result, ScoutError};

/// Locate the outermost `{...}` span in raw oracle output.
///
/// Models routinely wrap JSON in prose or code fences; everything outside
/// the first `{` and last `}` is discarded.
pub fn extract_json_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}

/// Collapse array values under known-scalar fields into comma-joined
/// strings.
fn collapse_scalar_arrays(json: &str, scalar_fields: &[&str]) -> String {
    let mut out = json.to_string();
    for field in scalar_fields {
        let pattern = format!(r#""{}"\s*:\s*\[([^\]]*)\]"#, regex::escape(field));
        // Field names are crate-controlled identifiers; the pattern is
        // always valid
        let re = Regex::new(&pattern).unwrap();
        out = re
            .replace_all(&out, |caps: &regex::Captures<'_>| {
                let joined = caps[1]
                    .split(',')
                    .map(|item| item.trim().trim_matches('"').trim())
                    .filter(|item| !item.is_empty())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(r#""{}": "{}""#, field, joined.replace('"', "'"))
            })
            .into_owned();
    }
    out
}

/// Strip trailing commas before closing braces and brackets.
fn strip_trailing_commas(json: &str) -> String {
    let re = Regex::new(r",\s*([}\]])").unwrap();
    re.replace_all(json, "$1").into_owned()
}

/// Parse oracle output into a JSON object, repairing once on failure.
pub fn repair_and_parse(raw: &str, scalar_fields: &[&str]) -> Result<Value> {
    let span = extract_json_span(raw).ok_or_else(|| ScoutError::MalformedResponse {
        reason: "no JSON object found in output".to_string(),
    })?;

    match serde_json::from_str::<Value>(span) {
        Ok(value) => Ok(value),
        Err(first_err) => {
            let repaired = strip_trailing_commas(&collapse_scalar_arrays(span, scalar_fields));
            serde_json::from_str::<Value>(&repaired).map_err(|_| ScoutError::MalformedResponse {
                reason: format!("parse failed after repair: {}", first_err),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_span_from_prose() {
        let raw = "Sure! Here is the JSON:\n```json\n{\"name\": \"Jane\"}\n```\nHope that helps.";
        assert_eq!(extract_json_span(raw), Some("{\"name\": \"Jane\"}"));
    }

    #[test]
    fn test_no_object_is_error() {
        let err = repair_and_parse("no braces here", &[]).unwrap_err();
        assert!(matches!(err, ScoutError::MalformedResponse { .. }));
    }

    #[test]
    fn test_strict_parse_passes_through() {
        let value = repair_and_parse(r#"{"name": "Jane", "tags": ["a"]}"#, &["name"]).unwrap();
        assert_eq!(value["name"], "Jane");
        // Valid arrays survive even under a scalar field name when the
        // strict parse succeeds
        assert!(value["tags"].is_array());
    }

    #[test]
    fn test_trailing_comma_repaired() {
        let value = repair_and_parse(r#"{"name": "Jane", }"#, &[]).unwrap();
        assert_eq!(value["name"], "Jane");
    }

    #[test]
    fn test_scalar_array_collapsed() {
        // Invalid JSON (trailing comma) forces the repair path, which also
        // collapses the array under a known-scalar field
        let raw = r#"{"genres_raw": ["Crime", "Fantasy"], "name": "Jane",}"#;
        let value = repair_and_parse(raw, &["genres_raw"]).unwrap();
        assert_eq!(value["genres_raw"], "Crime, Fantasy");
        assert_eq!(value["name"], "Jane");
    }

    #[test]
    fn test_unrepairable_is_error() {
        let err = repair_and_parse(r#"{"name": Jane missing quotes}"#, &[]).unwrap_err();
        assert!(matches!(err, ScoutError::MalformedResponse { .. }));
    }

    #[test]
    fn test_repair_is_deterministic() {
        let raw = r#"{"a": ["x", "y"],}"#;
        let one = repair_and_parse(raw, &["a"]).unwrap();
        let two = repair_and_parse(raw, &["a"]).unwrap();
        assert_eq!(one, two);
    }
}
