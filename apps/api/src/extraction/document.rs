// Free-text extraction: chat replies with embedded document updates, LaTeX documents,
// and plain prose (cover letters, objectives).

use super::{strip_code_fences, ExtractError};

pub const FULL_DOCUMENT_START: &str = "<<<FULL_DOCUMENT_UPDATE>>>";
pub const FULL_DOCUMENT_END: &str = "<<<END_FULL_DOCUMENT_UPDATE>>>";

/// Shown to the user in place of the embedded document.
pub const UPDATED_DOCUMENT_NOTE: &str = "[Resume has been updated with these changes]";

const DOCUMENT_CLASS: &str = "\\documentclass";
const END_DOCUMENT: &str = "\\end{document}";

/// A chat reply split into what the user reads and the optional replacement document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentUpdate {
    pub reply: String,
    pub document: Option<String>,
}

/// Scans a chat reply for a sentinel-delimited full-document update.
///
/// Both markers must appear exactly once, start before end. The text strictly between
/// them is returned untouched as the new document.
pub fn extract_document_update(reply: &str) -> Result<DocumentUpdate, ExtractError> {
    let starts = reply.matches(FULL_DOCUMENT_START).count();
    let ends = reply.matches(FULL_DOCUMENT_END).count();

    match (starts, ends) {
        (0, 0) => Ok(DocumentUpdate {
            reply: reply.trim().to_string(),
            document: None,
        }),
        (1, 1) => {
            // Counts of exactly one guarantee both finds succeed.
            let (Some(start), Some(end)) = (
                reply.find(FULL_DOCUMENT_START),
                reply.find(FULL_DOCUMENT_END),
            ) else {
                return Err(ExtractError::Markers("marker lookup failed".to_string()));
            };
            let body_start = start + FULL_DOCUMENT_START.len();
            if end < body_start {
                return Err(ExtractError::Markers(
                    "end marker appears before start marker".to_string(),
                ));
            }

            let document = reply[body_start..end].to_string();
            let before = reply[..start].trim_end();
            let after = reply[end + FULL_DOCUMENT_END.len()..].trim_start();
            let cleaned = [before, UPDATED_DOCUMENT_NOTE, after]
                .iter()
                .filter(|part| !part.is_empty())
                .copied()
                .collect::<Vec<_>>()
                .join("\n\n");

            Ok(DocumentUpdate {
                reply: cleaned,
                document: Some(document),
            })
        }
        (s, e) => Err(ExtractError::Markers(format!(
            "expected one start and one end marker, found {s} and {e}"
        ))),
    }
}

/// Pulls a LaTeX document out of a generation response.
///
/// Commentary before `\documentclass` and after `\end{document}` is dropped. A response
/// cut off before `\end{document}` is kept as-is from `\documentclass` onward.
pub fn extract_latex_document(text: &str) -> Result<String, ExtractError> {
    let text = strip_code_fences(text);
    let start = text.find(DOCUMENT_CLASS).ok_or(ExtractError::NotLatex)?;
    let body = &text[start..];
    let document = match body.find(END_DOCUMENT) {
        Some(end) => &body[..end + END_DOCUMENT.len()],
        None => body.trim_end(),
    };
    Ok(document.to_string())
}

/// Trimmed prose, fences removed. Empty output is an error.
pub fn extract_plain_text(text: &str) -> Result<String, ExtractError> {
    let text = strip_code_fences(text);
    if text.is_empty() {
        return Err(ExtractError::Empty);
    }
    Ok(text.to_string())
}
