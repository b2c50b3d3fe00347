// Prompt for the document-correction chat.

use crate::extraction::{FULL_DOCUMENT_END, FULL_DOCUMENT_START};
use crate::llm_client::prompts::{render, GROUNDING_INSTRUCTION};
use crate::models::chat::{ChatMessage, ChatRole};
use crate::providers::Prompt;

/// Opening assistant message of every session.
pub const CHAT_GREETING: &str =
    "I can help you make corrections to your resume. What would you like to change or improve?";

/// Only the most recent messages are replayed to the provider.
pub const HISTORY_WINDOW: usize = 10;

pub const CHAT_SYSTEM: &str = "You are an expert resume writer helping a user correct and \
    improve their LaTeX resume. Be friendly and professional.";

/// Replace: {grounding_instruction}, {start_marker}, {end_marker}, {document},
///          {history}, {message}
pub const CHAT_PROMPT_TEMPLATE: &str = r#"{grounding_instruction}

Response format:
- Start with a brief explanation of what you are changing.
- If you modify the LaTeX, give the EXACT and COMPLETE updated code.
- Conclude with any additional suggestions.

VERY IMPORTANT: when you provide the entire updated resume, put it between
{start_marker} and {end_marker}, each on its own line and each used exactly once.

CURRENT RESUME (LaTeX):
```
{document}
```

CONVERSATION SO FAR:
{history}

USER REQUEST:
{message}"#;

pub fn build_chat_prompt(document: &str, history: &[ChatMessage], message: &str) -> Prompt {
    let skip = history.len().saturating_sub(HISTORY_WINDOW);
    let transcript = history[skip..]
        .iter()
        .map(|m| {
            let speaker = match m.role {
                ChatRole::User => "User",
                ChatRole::Assistant => "Assistant",
            };
            format!("{speaker}: {}", m.content)
        })
        .collect::<Vec<_>>()
        .join("\n");

    Prompt::new(
        CHAT_SYSTEM,
        render(
            CHAT_PROMPT_TEMPLATE,
            &[
                ("grounding_instruction", GROUNDING_INSTRUCTION),
                ("start_marker", FULL_DOCUMENT_START),
                ("end_marker", FULL_DOCUMENT_END),
                ("history", &transcript),
                ("message", message),
                ("document", document),
            ],
        ),
    )
}
