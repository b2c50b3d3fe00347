// Short-form text extraction: single-field rewrites and achievement bullet lists.

use serde_json::Value;

use super::{extract_plain_text, find_json_object, find_string_array, strip_code_fences, ExtractError};

/// Plain-text rewrite of one resume field. Lines still written in all caps are
/// brought down to sentence case.
pub fn extract_enhanced_text(text: &str) -> Result<String, ExtractError> {
    let text = extract_plain_text(text)?;
    Ok(text
        .lines()
        .map(|line| {
            if is_shouting(line) {
                sentence_case(line)
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Bullet points as a JSON array, a `{"bullets": [...]}` object, or a markdown list.
pub fn extract_bullets(text: &str) -> Result<Vec<String>, ExtractError> {
    let bullets = find_string_array(text)
        .or_else(|| bullets_field(text))
        .unwrap_or_else(|| list_items(text));

    let bullets: Vec<String> = bullets
        .into_iter()
        .map(|b| b.trim().to_string())
        .filter(|b| !b.is_empty())
        .collect();
    if bullets.is_empty() {
        return Err(ExtractError::NoBullets);
    }
    Ok(bullets)
}

fn bullets_field(text: &str) -> Option<Vec<String>> {
    let mut value = find_json_object(text).ok()?;
    match value.get_mut("bullets")?.take() {
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
        ),
        _ => None,
    }
}

fn list_items(text: &str) -> Vec<String> {
    strip_code_fences(text)
        .lines()
        .filter_map(|line| {
            let line = line.trim_start();
            for marker in ["- ", "* ", "• "] {
                if let Some(rest) = line.strip_prefix(marker) {
                    return Some(rest.to_string());
                }
            }
            // "1. text" / "12) text"
            let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
            if digits == 0 {
                return None;
            }
            line[digits..]
                .strip_prefix(". ")
                .or_else(|| line[digits..].strip_prefix(") "))
                .map(str::to_string)
        })
        .collect()
}

/// More than one word of letters and no lowercase letter at all.
fn is_shouting(line: &str) -> bool {
    let words_with_letters = line
        .split_whitespace()
        .filter(|w| w.chars().any(char::is_alphabetic))
        .count();
    words_with_letters > 1 && !line.chars().any(char::is_lowercase)
}

fn sentence_case(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut capitalize_next = true;
    for c in line.chars() {
        if c.is_alphabetic() {
            if capitalize_next {
                out.extend(c.to_uppercase());
                capitalize_next = false;
            } else {
                out.extend(c.to_lowercase());
            }
        } else {
            if matches!(c, '.' | '!' | '?') {
                capitalize_next = true;
            }
            out.push(c);
        }
    }
    out
}
