//! Structured output recovery.
//!
//! Generators are asked for a single JSON object but are free to wrap it in
//! code fences, surround it with prose, or stop halfway through. [`recover`]
//! is the one place where that noise is absorbed: it never fails, and always
//! returns either the recovered object or an `{"error", "raw_text"}` record.

use serde_json::{Map, Value};
use tracing::debug;

/// Maximum number of characters of the original text kept in an error record
pub const RAW_TEXT_LIMIT: usize = 500;

const FENCE: &str = "```";

/// Extract a single JSON object from arbitrary generator text.
///
/// On failure the returned map holds exactly two keys: `error` (a short
/// description) and `raw_text` (the input, truncated to [`RAW_TEXT_LIMIT`]).
pub fn recover(raw_text: &str) -> Map<String, Value> {
    let stripped = strip_fence(raw_text);
    if stripped.is_empty() {
        return error_record("empty generator output", raw_text);
    }

    let mut whole_text_error = None;
    if is_wrapped(stripped) {
        match parse_object(stripped) {
            Ok(map) => return map,
            Err(e) => whole_text_error = Some(e),
        }
    }

    match scan_candidate(stripped) {
        Some(candidate) => match parse_object(candidate) {
            Ok(map) => {
                debug!(
                    candidate_len = candidate.len(),
                    raw_len = raw_text.len(),
                    "Recovered JSON object from surrounding text"
                );
                map
            }
            Err(e) => error_record(&e, raw_text),
        },
        None => {
            let reason = whole_text_error.unwrap_or_else(|| "no JSON object found".to_string());
            error_record(&reason, raw_text)
        }
    }
}

/// True when `map` is the error record produced by [`recover`]
pub fn is_recovery_error(map: &Map<String, Value>) -> bool {
    map.len() == 2 && map.contains_key("error") && map.contains_key("raw_text")
}

/// Drop a code fence wrapping the content. The opening fence line (which
/// usually carries a language tag) is discarded whole.
fn strip_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix(FENCE) else {
        return trimmed;
    };

    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    let body = body.trim_end();
    body.strip_suffix(FENCE).unwrap_or(body).trim()
}

fn is_wrapped(text: &str) -> bool {
    (text.starts_with('{') && text.ends_with('}')) || (text.starts_with('[') && text.ends_with(']'))
}

/// Find the first balanced `{...}` or `[...]` run, starting at the earliest
/// opening delimiter. Closers that do not match the innermost opener are
/// skipped, and delimiters inside string literals are not counted.
fn scan_candidate(text: &str) -> Option<&str> {
    let start = text.find(|c| c == '{' || c == '[')?;
    let mut stack: Vec<u8> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (offset, byte) in text.as_bytes()[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if *byte == b'\\' {
                escaped = true;
            } else if *byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' | b'[' => stack.push(*byte),
            b'}' | b']' => {
                let opener = if *byte == b'}' { b'{' } else { b'[' };
                if stack.last() == Some(&opener) {
                    stack.pop();
                    if stack.is_empty() {
                        return Some(&text[start..start + offset + 1]);
                    }
                }
            }
            _ => {}
        }
    }

    None
}

fn parse_object(candidate: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Array(_)) => Err("expected a JSON object, found an array".to_string()),
        Ok(_) => Err("expected a JSON object, found a scalar".to_string()),
        Err(e) => Err(format!("invalid JSON: {}", e)),
    }
}

fn error_record(description: &str, raw_text: &str) -> Map<String, Value> {
    debug!(error = description, raw_len = raw_text.len(), "Structured output not recoverable");

    let mut truncated: String = raw_text.chars().take(RAW_TEXT_LIMIT).collect();
    if raw_text.chars().count() > RAW_TEXT_LIMIT {
        truncated.push_str("...");
    }

    let mut map = Map::new();
    map.insert("error".to_string(), Value::String(description.to_string()));
    map.insert("raw_text".to_string(), Value::String(truncated));
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fenced_json() {
        let map = recover("```json\n{\"a\":1}\n```");
        assert_eq!(Value::Object(map), json!({"a": 1}));
    }

    #[test]
    fn test_not_json_at_all() {
        let map = recover("not json at all");
        assert!(is_recovery_error(&map));
        assert_eq!(map["raw_text"], json!("not json at all"));
    }

    #[test]
    fn test_object_surrounded_by_prose() {
        let raw = r#"Sure! Here is the classification: {"route": "TECH", "confidence": 0.9} Hope that helps."#;
        let map = recover(raw);
        assert_eq!(map["route"], json!("TECH"));
    }

    #[test]
    fn test_stray_closer_is_ignored() {
        let raw = r#"note] {"a": {"b": [1, 2]}, "c": "x"} trailing"#;
        let map = recover(raw);
        assert_eq!(map["a"]["b"], json!([1, 2]));
        assert_eq!(map["c"], json!("x"));
    }

    #[test]
    fn test_braces_inside_strings() {
        let raw = r#"result: {"edit": "use {braces} and \"quotes\"", "n": 2} done"#;
        let map = recover(raw);
        assert_eq!(map["edit"], json!("use {braces} and \"quotes\""));
        assert_eq!(map["n"], json!(2));
    }

    #[test]
    fn test_truncated_object_is_error() {
        let map = recover(r#"{"scores": {"intent": 3, "clarity": "#);
        assert!(is_recovery_error(&map));
    }

    #[test]
    fn test_first_of_two_objects() {
        let map = recover(r#"{"a": 1} {"b": 2}"#);
        assert_eq!(Value::Object(map), json!({"a": 1}));
    }

    #[test]
    fn test_array_is_not_a_mapping() {
        let map = recover("[1, 2, 3]");
        assert!(is_recovery_error(&map));
        assert!(map["error"].as_str().unwrap().contains("array"));
    }

    #[test]
    fn test_empty_input() {
        let map = recover("   ");
        assert!(is_recovery_error(&map));
    }

    #[test]
    fn test_fence_without_language_tag() {
        let map = recover("```\n{\"winner\": \"X\"}\n```");
        assert_eq!(map["winner"], json!("X"));
    }

    #[test]
    fn test_raw_text_is_truncated() {
        let raw = "ü".repeat(RAW_TEXT_LIMIT + 20);
        let map = recover(&raw);
        let kept = map["raw_text"].as_str().unwrap();
        assert_eq!(kept.chars().count(), RAW_TEXT_LIMIT + 3);
        assert!(kept.ends_with("..."));
    }

    #[test]
    fn test_legitimate_error_key_is_not_a_recovery_error() {
        let map = recover(r#"{"error": "none", "raw_text": "x", "ok": true}"#);
        assert!(!is_recovery_error(&map));
    }
}
