//! Provider Adapters: one per external text-generation backend.
//!
//! Each adapter wraps exactly one network call per `invoke` and picks a model per
//! task kind. Adapters never retry; the orchestrator owns ordering and fallback.
//!
//! `AppState` carries the adapters inside the `Orchestrator` as
//! `Vec<Arc<dyn ProviderAdapter>>`, built once at startup by `build_adapters`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;

pub mod gemini;
pub mod huggingface;
pub mod openai;

pub use gemini::GeminiAdapter;
pub use huggingface::HuggingFaceAdapter;
pub use openai::OpenAiAdapter;

// ────────────────────────────────────────────────────────────────────────────
// Shared types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    #[serde(rename = "gemini")]
    Gemini,
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "huggingface")]
    HuggingFace,
}

impl ProviderKind {
    /// Fallback order under `auto`.
    pub const PRIORITY: [ProviderKind; 3] = [
        ProviderKind::Gemini,
        ProviderKind::OpenAi,
        ProviderKind::HuggingFace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::OpenAi => "openai",
            ProviderKind::HuggingFace => "huggingface",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The AI operations the service performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Parse,
    Enhance,
    GenerateDocument,
    CoverLetter,
    CareerObjective,
    EnhanceText,
    AchievementBullets,
    Chat,
}

/// Model size class an adapter should use for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    /// Fast, cheap model for structured extraction.
    Extraction,
    /// Larger model for long-form writing.
    Generation,
}

impl TaskKind {
    pub fn tier(&self) -> ModelTier {
        match self {
            TaskKind::Parse => ModelTier::Extraction,
            _ => ModelTier::Generation,
        }
    }

    /// Tasks whose answer must be a JSON object.
    pub fn expects_json(&self) -> bool {
        matches!(self, TaskKind::Parse | TaskKind::Enhance)
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskKind::Parse => "parse",
            TaskKind::Enhance => "enhance",
            TaskKind::GenerateDocument => "generate_document",
            TaskKind::CoverLetter => "cover_letter",
            TaskKind::CareerObjective => "career_objective",
            TaskKind::EnhanceText => "enhance_text",
            TaskKind::AchievementBullets => "achievement_bullets",
            TaskKind::Chat => "chat",
        };
        f.write_str(name)
    }
}

/// A rendered prompt: system instruction plus the user turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("authentication failed: {0}")]
    AuthFailure(String),

    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// The adapter trait. Implement this to add a backend without touching the
/// orchestrator, handlers, or chat code.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// `false` when credentials are missing or the client could not be built.
    fn is_available(&self) -> bool;

    /// Issues one request and returns the model's raw text.
    async fn invoke(&self, task: TaskKind, prompt: &Prompt) -> Result<String, ProviderError>;
}

/// Builds every adapter in priority order. Adapters without credentials are still
/// returned and report themselves unavailable.
pub fn build_adapters(config: &Config) -> Vec<Arc<dyn ProviderAdapter>> {
    let timeout = Duration::from_secs(config.provider_timeout_secs);
    vec![
        Arc::new(GeminiAdapter::new(config.gemini_api_key.clone(), timeout)),
        Arc::new(OpenAiAdapter::new(config.openai_api_key.clone(), timeout)),
        Arc::new(HuggingFaceAdapter::new(config.hf_api_key.clone(), timeout)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_serde_names() {
        assert_eq!(
            serde_json::to_string(&ProviderKind::OpenAi).unwrap(),
            r#""openai""#
        );
        let kind: ProviderKind = serde_json::from_str(r#""huggingface""#).unwrap();
        assert_eq!(kind, ProviderKind::HuggingFace);
    }

    #[test]
    fn test_priority_order() {
        assert_eq!(
            ProviderKind::PRIORITY,
            [
                ProviderKind::Gemini,
                ProviderKind::OpenAi,
                ProviderKind::HuggingFace
            ]
        );
    }

    #[test]
    fn test_only_parse_uses_extraction_tier() {
        assert_eq!(TaskKind::Parse.tier(), ModelTier::Extraction);
        assert_eq!(TaskKind::GenerateDocument.tier(), ModelTier::Generation);
        assert_eq!(TaskKind::Chat.tier(), ModelTier::Generation);
    }

    #[test]
    fn test_json_tasks() {
        assert!(TaskKind::Parse.expects_json());
        assert!(TaskKind::Enhance.expects_json());
        assert!(!TaskKind::CoverLetter.expects_json());
        // A bullet list is a JSON array, which OpenAI's json_object mode rejects.
        assert!(!TaskKind::AchievementBullets.expects_json());
        assert_eq!(TaskKind::EnhanceText.to_string(), "enhance_text");
    }

    #[test]
    fn test_build_adapters_without_keys_reports_unavailable() {
        let config = Config::for_tests();
        let adapters = build_adapters(&config);
        let kinds: Vec<_> = adapters.iter().map(|a| a.kind()).collect();
        assert_eq!(kinds, ProviderKind::PRIORITY.to_vec());
        assert!(adapters.iter().all(|a| !a.is_available()));
    }
}
