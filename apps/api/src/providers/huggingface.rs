//! Hugging Face Inference API adapter (text-generation). Last-resort provider.
//!
//! Text-generation models take a single input string, so the system and user parts of
//! the prompt are concatenated.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::llm_client::{send_json, ProviderConnection};
use crate::providers::{ModelTier, Prompt, ProviderAdapter, ProviderError, ProviderKind, TaskKind};

const HF_API_URL: &str = "https://api-inference.huggingface.co";
const EXTRACTION_MODEL: &str = "HuggingFaceH4/zephyr-7b-beta";
const GENERATION_MODEL: &str = "mistralai/Mistral-7B-Instruct-v0.3";
const TEMPERATURE: f32 = 0.7;

#[derive(Debug, Serialize)]
struct TextGenerationRequest<'a> {
    inputs: &'a str,
    parameters: TextGenerationParameters,
}

#[derive(Debug, Serialize)]
struct TextGenerationParameters {
    max_new_tokens: u32,
    temperature: f32,
    return_full_text: bool,
}

#[derive(Debug, Deserialize)]
struct GeneratedText {
    generated_text: String,
}

pub struct HuggingFaceAdapter {
    conn: ProviderConnection,
}

impl HuggingFaceAdapter {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            conn: ProviderConnection::new(ProviderKind::HuggingFace, api_key, timeout, HF_API_URL),
        }
    }

    #[cfg(test)]
    pub fn with_base_url(self, base_url: &str) -> Self {
        Self {
            conn: self.conn.with_base_url(base_url),
        }
    }

    fn model_for(task: TaskKind) -> (&'static str, u32) {
        match task.tier() {
            ModelTier::Extraction => (EXTRACTION_MODEL, 1000),
            ModelTier::Generation => (GENERATION_MODEL, 2048),
        }
    }
}

#[async_trait]
impl ProviderAdapter for HuggingFaceAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::HuggingFace
    }

    fn is_available(&self) -> bool {
        self.conn.is_available()
    }

    async fn invoke(&self, task: TaskKind, prompt: &Prompt) -> Result<String, ProviderError> {
        let (client, api_key) = self.conn.parts()?;
        let (model, max_new_tokens) = Self::model_for(task);
        let inputs = format!("{}\n\n{}", prompt.system, prompt.user);

        let body = TextGenerationRequest {
            inputs: &inputs,
            parameters: TextGenerationParameters {
                max_new_tokens,
                temperature: TEMPERATURE,
                return_full_text: false,
            },
        };

        let generated: Vec<GeneratedText> = send_json(
            ProviderKind::HuggingFace,
            client
                .post(format!("{}/models/{model}", self.conn.base_url()))
                .bearer_auth(api_key)
                .json(&body),
        )
        .await?;

        generated
            .into_iter()
            .next()
            .map(|g| g.generated_text)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| {
                ProviderError::MalformedResponse("Hugging Face returned no generated text".to_string())
            })
    }
}
