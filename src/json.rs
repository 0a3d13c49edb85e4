//! Tolerant JSON extraction from model output.
//!
//! Models wrap JSON in markdown fences, emit Python's `None`, put raw
//! newlines inside strings and leave trailing commas. [`extract_json`]
//! strips and repairs those before parsing and reports failure as a value
//! instead of an error, so callers decide how to degrade.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

static NONE_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bNone\b").expect("valid regex"));
// Not string-aware: only applied after a failed parse, and it rewrites
// `, ]` inside string values too.
static TRAILING_COMMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*([\]}])").expect("valid regex"));

/// Outcome of [`extract_json`].
#[derive(Debug, Clone, PartialEq)]
pub enum JsonExtraction {
    Parsed(Value),
    Failed(String),
}

impl JsonExtraction {
    pub fn is_parsed(&self) -> bool {
        matches!(self, JsonExtraction::Parsed(_))
    }

    /// The parsed value, or an empty object when extraction failed.
    pub fn unwrap_or_empty(self) -> Value {
        match self {
            JsonExtraction::Parsed(value) => value,
            JsonExtraction::Failed(_) => Value::Object(Default::default()),
        }
    }
}

/// Strip a ```` ```json ```` fence without parsing.
///
/// Takes everything after the first json fence (if any) up to the last
/// closing fence, trimmed.
pub fn get_json_content(response: &str) -> String {
    let mut content = response;
    if let Some(start) = content.find(JSON_FENCE) {
        content = &content[start + JSON_FENCE.len()..];
    }
    if let Some(end) = content.rfind(FENCE) {
        content = &content[..end];
    }
    content.trim().to_string()
}

/// Locate the JSON payload inside `content`.
fn fenced_payload(content: &str) -> &str {
    match content.find(JSON_FENCE) {
        Some(start) => {
            let body_start = start + JSON_FENCE.len();
            match content.rfind(FENCE) {
                Some(end) if end >= body_start => &content[body_start..end],
                // unterminated fence
                _ => &content[body_start..],
            }
        }
        None => content,
    }
}

/// Normalize whitespace and Python literals so the parser sees one line.
fn normalize(payload: &str) -> String {
    let payload = NONE_TOKEN.replace_all(payload.trim(), "null");
    payload
        .replace(['\n', '\r'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extract and parse JSON from free-form model text.
pub fn extract_json(content: &str) -> JsonExtraction {
    let normalized = normalize(fenced_payload(content));

    let first_error = match serde_json::from_str::<Value>(&normalized) {
        Ok(value) => return JsonExtraction::Parsed(value),
        Err(e) => e,
    };

    tracing::debug!(error = %first_error, "JSON parse failed, removing trailing commas");
    let repaired = TRAILING_COMMA.replace_all(&normalized, "$1");
    match serde_json::from_str::<Value>(&repaired) {
        Ok(value) => JsonExtraction::Parsed(value),
        Err(e) => JsonExtraction::Failed(format!("{} (before repair: {})", e, first_error)),
    }
}

/// Legacy contract: the parsed value, or an empty object on failure.
pub fn extract_json_or_empty(content: &str) -> Value {
    let extraction = extract_json(content);
    if let JsonExtraction::Failed(reason) = &extraction {
        tracing::warn!(%reason, "Failed to parse JSON even after cleanup");
    }
    extraction.unwrap_or_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fenced_json_round_trips() {
        let response = "Here you go:\n```json\n{\"toc_detected\": \"yes\", \"pages\": [1, 2]}\n```\nDone.";
        assert_eq!(
            extract_json(response),
            JsonExtraction::Parsed(json!({"toc_detected": "yes", "pages": [1, 2]}))
        );
    }

    #[test]
    fn test_plain_json_without_fence() {
        let value = extract_json_or_empty(r#"  [{"title": "Intro"}]  "#);
        assert_eq!(value, json!([{"title": "Intro"}]));
    }

    #[test]
    fn test_trailing_commas_repaired() {
        let response = "```json\n[\n  {\"structure\": \"1\", \"title\": \"A\",},\n  {\"structure\": \"2\", \"title\": \"B\"},\n]\n```";
        let value = extract_json(response);
        assert!(value.is_parsed());
        assert_eq!(value.unwrap_or_empty().as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_trailing_comma_repair_also_touches_strings() {
        let value = extract_json_or_empty(r#"{"items": ["a, ]", "b"],}"#);
        assert_eq!(value["items"], json!(["a]", "b"]));

        // well-formed input never reaches the repair pass
        let value = extract_json_or_empty(r#"{"items": ["a, ]"]}"#);
        assert_eq!(value["items"], json!(["a, ]"]));
    }

    #[test]
    fn test_none_becomes_null() {
        let value = extract_json_or_empty(r#"{"structure": None, "title": "Nonexistent"}"#);
        assert_eq!(value["structure"], Value::Null);
        assert_eq!(value["title"], "Nonexistent");
    }

    #[test]
    fn test_raw_newlines_inside_strings() {
        let value = extract_json_or_empty("{\"title\": \"Line one\nline   two\"}");
        assert_eq!(value["title"], "Line one line two");
    }

    #[test]
    fn test_non_json_is_empty_mapping() {
        let extraction = extract_json("I could not find a table of contents.");
        assert!(matches!(extraction, JsonExtraction::Failed(_)));
        assert_eq!(extraction.unwrap_or_empty(), json!({}));
        assert_eq!(extract_json_or_empty("nope"), json!({}));
    }

    #[test]
    fn test_unterminated_fence() {
        let value = extract_json_or_empty("```json\n{\"answer\": \"yes\"}");
        assert_eq!(value, json!({"answer": "yes"}));
    }

    #[test]
    fn test_get_json_content() {
        assert_eq!(get_json_content("```json\n[1, 2]\n```"), "[1, 2]");
        assert_eq!(get_json_content("  {\"a\": 1} "), "{\"a\": 1}");
    }
}
