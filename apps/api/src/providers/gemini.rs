//! Google Gemini adapter (`generateContent`). Primary provider.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::llm_client::{send_json, ProviderConnection};
use crate::providers::{ModelTier, Prompt, ProviderAdapter, ProviderError, ProviderKind, TaskKind};

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com";
const EXTRACTION_MODEL: &str = "gemini-1.5-flash";
const GENERATION_MODEL: &str = "gemini-1.5-pro";
const MAX_OUTPUT_TOKENS: u32 = 8192;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenates the text parts of the first candidate.
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

pub struct GeminiAdapter {
    conn: ProviderConnection,
}

impl GeminiAdapter {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            conn: ProviderConnection::new(ProviderKind::Gemini, api_key, timeout, GEMINI_API_URL),
        }
    }

    #[cfg(test)]
    pub fn with_base_url(self, base_url: &str) -> Self {
        Self {
            conn: self.conn.with_base_url(base_url),
        }
    }

    fn model_for(task: TaskKind) -> &'static str {
        match task.tier() {
            ModelTier::Extraction => EXTRACTION_MODEL,
            ModelTier::Generation => GENERATION_MODEL,
        }
    }
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    fn is_available(&self) -> bool {
        self.conn.is_available()
    }

    async fn invoke(&self, task: TaskKind, prompt: &Prompt) -> Result<String, ProviderError> {
        let (client, api_key) = self.conn.parts()?;
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.conn.base_url(),
            Self::model_for(task)
        );

        let body = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: &prompt.system,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: &prompt.user }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: MAX_OUTPUT_TOKENS,
                response_mime_type: task.expects_json().then_some("application/json"),
            },
        };

        let response: GenerateContentResponse = send_json(
            ProviderKind::Gemini,
            client
                .post(url)
                .header("x-goog-api-key", api_key)
                .json(&body),
        )
        .await?;

        response.text().ok_or_else(|| {
            ProviderError::MalformedResponse("Gemini returned no text candidates".to_string())
        })
    }
}
