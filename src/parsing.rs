//! Loose JSON extraction for model output.
//!
//! The completion service is asked for bare JSON but sometimes wraps it in
//! markdown fences or chatty prose. [`parse_loose`] recovers the value with a
//! fixed sequence of cheap attempts; it is not a relaxed-grammar parser and
//! never repairs the JSON itself.

use crate::error::Result;
use crate::GenerationError;
use serde_json::Value;

/// Parse one JSON value out of `text`, first match wins:
///
/// 1. the whole text;
/// 2. the text with a leading `` ```lang `` and trailing `` ``` `` removed;
/// 3. the span from the first `{` to the last `}`;
/// 4. the span from the first `[` to the last `]`.
///
/// Fails with [`GenerationError::Parse`] carrying the original text.
///
/// # Example
///
/// ```
/// use classtoon::parsing::parse_loose;
///
/// let value = parse_loose("Here you go:\n[1, 2, 3]\nEnjoy!").unwrap();
/// assert_eq!(value, serde_json::json!([1, 2, 3]));
/// ```
pub fn parse_loose(text: &str) -> Result<Value> {
    if let Ok(val) = serde_json::from_str::<Value>(text) {
        return Ok(val);
    }

    let cleaned = strip_code_fence(text);
    if let Ok(val) = serde_json::from_str::<Value>(cleaned) {
        return Ok(val);
    }

    if let Some(val) = parse_span(cleaned, '{', '}') {
        return Ok(val);
    }
    if let Some(val) = parse_span(cleaned, '[', ']') {
        return Ok(val);
    }

    Err(GenerationError::Parse {
        raw: text.to_string(),
    })
}

/// Remove a leading `` ```lang `` fence line and a trailing `` ``` ``.
///
/// Either marker may be missing; the result is trimmed.
pub fn strip_code_fence(text: &str) -> &str {
    let mut s = text.trim();
    if let Some(rest) = s.strip_prefix("```") {
        let lang_len = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        let rest = &rest[lang_len..];
        s = rest.strip_prefix('\n').unwrap_or(rest);
    }
    if let Some(rest) = s.trim_end().strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

/// Parse the substring between the first `open` and the last `close`.
fn parse_span(text: &str, open: char, close: char) -> Option<Value> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&text[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_direct_parse() {
        assert_eq!(parse_loose(r#"{"a": 1}"#).unwrap(), json!({"a": 1}));
        assert_eq!(parse_loose("  [1, 2]\n").unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_fenced_equals_unfenced() {
        let plain = r#"{"scenes": [{"beat": "x"}], "prompt_meta": {"title": "t"}}"#;
        let fenced = format!("```json\n{plain}\n```");
        let bare_fence = format!("```\n{plain}\n```");
        let direct = parse_loose(plain).unwrap();
        assert_eq!(parse_loose(&fenced).unwrap(), direct);
        assert_eq!(parse_loose(&bare_fence).unwrap(), direct);
    }

    #[test]
    fn test_object_in_prose() {
        let text = "Sure! Here is the JSON: {\"title\": \"Kelinci\"} Hope it helps.";
        assert_eq!(parse_loose(text).unwrap(), json!({"title": "Kelinci"}));
    }

    #[test]
    fn test_array_of_objects_in_prose() {
        let array = json!([
            {"beat": "Kelinci bangun", "dialog": "Halo!"},
            {"beat": "Kelinci berbagi wortel", "dialog": ""}
        ]);
        let text = format!("Berikut hasilnya:\n{array}\nSemoga bermanfaat.");
        assert_eq!(parse_loose(&text).unwrap(), array);
    }

    #[test]
    fn test_unrecoverable_keeps_raw() {
        let text = "I'm sorry, I cannot help with that.";
        let err = parse_loose(text).unwrap_err();
        assert!(matches!(err, GenerationError::Parse { .. }));
        assert_eq!(err.raw_text(), Some(text));
    }

    #[test]
    fn test_reversed_braces_rejected() {
        assert!(parse_loose("} oops {").is_err());
    }

    #[test]
    fn test_truncated_json_rejected() {
        assert!(parse_loose(r#"{"scenes": [{"beat": "a"}, {"beat": "#).is_err());
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fence("```[1]```"), "[1]");
        assert_eq!(strip_code_fence("[1]"), "[1]");
        assert_eq!(strip_code_fence("```JSON\n{}\n```  \n"), "{}");
    }
}
