//! Response Extractor: turns raw provider text into typed task output.
//!
//! Providers wrap their answers in markdown fences, prepend chatty preambles and
//! occasionally append notes. Everything here is synchronous and pure, so each
//! provider's output can be judged on its own before the orchestrator decides
//! whether to fall through to the next provider.

use thiserror::Error;

pub mod document;
pub mod resume;
pub mod text;

pub use document::{
    extract_document_update, extract_latex_document, extract_plain_text, FULL_DOCUMENT_END,
    FULL_DOCUMENT_START,
};
pub use resume::{parse_enhanced, parse_resume, ParsedResume};
pub use text::{extract_bullets, extract_enhanced_text};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractError {
    #[error("no JSON object found in response")]
    NoJsonObject,

    #[error("response does not match the resume schema: {0}")]
    Schema(String),

    #[error("response is missing required data: {0}")]
    MissingField(String),

    #[error("document update markers are malformed: {0}")]
    Markers(String),

    #[error("response is not a LaTeX document")]
    NotLatex,

    #[error("response is empty")]
    Empty,

    #[error("response contains no bullet points")]
    NoBullets,
}

/// Removes a surrounding markdown code fence (```json, ```latex, bare ```).
pub fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (language tag) on the opening line.
    let body = match rest.find('\n') {
        Some(newline) if !rest[..newline].contains('`') => &rest[newline + 1..],
        _ => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Finds the first balanced `{...}` span that parses as a JSON object.
///
/// String literals and escapes are respected while matching braces, so a `}` inside a
/// value does not end the span early. Spans that balance but fail to parse are skipped.
pub fn find_json_object(text: &str) -> Result<serde_json::Value, ExtractError> {
    let text = strip_code_fences(text);
    let bytes = text.as_bytes();

    for (start, _) in text.match_indices('{') {
        let Some(end) = balanced_end(&bytes[start..], b'{', b'}') else {
            continue;
        };
        let candidate = &text[start..start + end];
        if let Ok(value @ serde_json::Value::Object(_)) = serde_json::from_str(candidate) {
            return Ok(value);
        }
    }
    Err(ExtractError::NoJsonObject)
}

/// Finds the first balanced `[...]` span that parses as an array of strings.
pub fn find_string_array(text: &str) -> Option<Vec<String>> {
    let text = strip_code_fences(text);
    let bytes = text.as_bytes();

    text.match_indices('[').find_map(|(start, _)| {
        let end = balanced_end(&bytes[start..], b'[', b']')?;
        serde_json::from_str::<Vec<String>>(&text[start..start + end]).ok()
    })
}

/// Length of the balanced span starting at `bytes[0] == open`, if it closes.
fn balanced_end(bytes: &[u8], open: u8, close: u8) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            _ if b == open => depth += 1,
            _ if b == close => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_code_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_code_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_fences_latex_tag() {
        let input = "```latex\n\\documentclass{article}\n```";
        assert_eq!(strip_code_fences(input), "\\documentclass{article}");
    }

    #[test]
    fn test_no_fences_is_unchanged() {
        assert_eq!(strip_code_fences("  plain  "), "plain");
    }

    #[test]
    fn test_finds_object_after_preamble() {
        let text = "Sure! Here is the data:\n{\"name\": \"Ada\"}\nLet me know if you need more.";
        assert_eq!(find_json_object(text).unwrap(), json!({"name": "Ada"}));
    }

    #[test]
    fn test_braces_inside_strings_do_not_end_span() {
        let text = r#"{"summary": "uses {curly} braces and \"quotes\" }", "n": 1}"#;
        let value = find_json_object(text).unwrap();
        assert_eq!(value["n"], json!(1));
        assert_eq!(value["summary"], json!("uses {curly} braces and \"quotes\" }"));
    }

    #[test]
    fn test_skips_unparseable_span_and_takes_next() {
        let text = "{not json} then {\"ok\": true}";
        assert_eq!(find_json_object(text).unwrap(), json!({"ok": true}));
    }

    #[test]
    fn test_nested_objects_return_outermost() {
        let text = "{\"a\": {\"b\": 1}}";
        assert_eq!(find_json_object(text).unwrap(), json!({"a": {"b": 1}}));
    }

    #[test]
    fn test_finds_string_array_after_preamble() {
        let text = "Here you go:\n```json\n[\"Led [team] of 5\", \"Cut costs\"]\n```";
        assert_eq!(
            find_string_array(text),
            Some(vec!["Led [team] of 5".to_string(), "Cut costs".to_string()])
        );
        assert_eq!(find_string_array("[1, 2]"), None);
        assert_eq!(find_string_array("no array"), None);
    }

    #[test]
    fn test_unbalanced_is_error() {
        assert_eq!(
            find_json_object("{\"a\": 1").unwrap_err(),
            ExtractError::NoJsonObject
        );
        assert_eq!(
            find_json_object("no json here").unwrap_err(),
            ExtractError::NoJsonObject
        );
    }
}
