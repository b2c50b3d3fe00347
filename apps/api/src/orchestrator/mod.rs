//! Orchestrator: the only caller of the provider adapters.
//!
//! One request walks `PENDING → TRYING(provider_i) → SUCCEEDED | TRYING(provider_i+1) |
//! EXHAUSTED`. Providers are tried strictly one after another, never raced. A provider
//! whose output cannot be extracted counts as failed, exactly like a network error.
//!
//! Credits are not touched here; callers charge before calling `run`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::extraction::{
    self, extract_bullets, extract_document_update, extract_enhanced_text,
    extract_latex_document, extract_plain_text, ParsedResume,
};
use crate::models::chat::ChatMessage;
use crate::models::resume::{ExperienceLevel, OptimizationOptions, ResumeRecord};
use crate::providers::{ProviderAdapter, ProviderError, ProviderKind, TaskKind};

pub mod prompts;

// ────────────────────────────────────────────────────────────────────────────
// Request / result types
// ────────────────────────────────────────────────────────────────────────────

/// Which providers a request may use. `Auto` enables the fallback chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderPreference {
    #[default]
    Auto,
    Gemini,
    #[serde(rename = "openai")]
    OpenAi,
}

impl ProviderPreference {
    fn pinned(&self) -> Option<ProviderKind> {
        match self {
            ProviderPreference::Auto => None,
            ProviderPreference::Gemini => Some(ProviderKind::Gemini),
            ProviderPreference::OpenAi => Some(ProviderKind::OpenAi),
        }
    }
}

/// Typed input for each task kind.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskPayload {
    Parse {
        text: String,
    },
    Enhance {
        resume: ResumeRecord,
        options: OptimizationOptions,
    },
    GenerateDocument {
        resume: ResumeRecord,
        experience_level: ExperienceLevel,
    },
    CoverLetter {
        resume: ResumeRecord,
        job_description: String,
    },
    CareerObjective {
        resume: ResumeRecord,
        target_role: Option<String>,
    },
    /// Rewrite of one field, e.g. an experience description.
    EnhanceText {
        text: String,
        context: String,
    },
    AchievementBullets {
        description: String,
        role: String,
    },
    Chat {
        document: String,
        history: Vec<ChatMessage>,
        message: String,
    },
}

impl TaskPayload {
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskPayload::Parse { .. } => TaskKind::Parse,
            TaskPayload::Enhance { .. } => TaskKind::Enhance,
            TaskPayload::GenerateDocument { .. } => TaskKind::GenerateDocument,
            TaskPayload::CoverLetter { .. } => TaskKind::CoverLetter,
            TaskPayload::CareerObjective { .. } => TaskKind::CareerObjective,
            TaskPayload::EnhanceText { .. } => TaskKind::EnhanceText,
            TaskPayload::AchievementBullets { .. } => TaskKind::AchievementBullets,
            TaskPayload::Chat { .. } => TaskKind::Chat,
        }
    }
}

/// Typed output for each task kind.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutput {
    /// Parse and enhance.
    Resume {
        resume: ResumeRecord,
        missing_skills: bool,
    },
    /// LaTeX source.
    Document(String),
    /// Cover letter, career objective or a rewritten field.
    Text(String),
    Bullets(Vec<String>),
    Chat {
        reply: String,
        updated_document: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct OperationRequest {
    pub payload: TaskPayload,
    pub preference: ProviderPreference,
}

impl OperationRequest {
    pub fn new(payload: TaskPayload, preference: ProviderPreference) -> Self {
        Self {
            payload,
            preference,
        }
    }
}

/// One provider that was tried and failed.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedAttempt {
    pub provider: ProviderKind,
    pub error: ProviderError,
}

#[derive(Debug, Clone)]
pub struct OperationResult {
    pub output: TaskOutput,
    /// `None` only for the degraded parse placeholder.
    pub provider_used: Option<ProviderKind>,
    pub warnings: Vec<String>,
    pub degraded: bool,
    pub attempts: Vec<FailedAttempt>,
}

/// Decides whether a provider failure may fall through to the next provider.
pub type RetryPredicate = Arc<dyn Fn(TaskKind, &ProviderError) -> bool + Send + Sync>;

/// Every provider-scoped failure falls through.
pub fn always_fall_through() -> RetryPredicate {
    Arc::new(|_, _| true)
}

// ────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ────────────────────────────────────────────────────────────────────────────

pub struct Orchestrator {
    adapters: Vec<Arc<dyn ProviderAdapter>>,
    should_fall_through: RetryPredicate,
}

impl Orchestrator {
    /// Adapters are reordered into provider priority order.
    pub fn new(mut adapters: Vec<Arc<dyn ProviderAdapter>>) -> Self {
        adapters.sort_by_key(|a| priority_index(a.kind()));
        Self {
            adapters,
            should_fall_through: always_fall_through(),
        }
    }

    #[cfg(test)]
    pub fn with_retry_predicate(mut self, predicate: RetryPredicate) -> Self {
        self.should_fall_through = predicate;
        self
    }

    /// `(provider, available)` in priority order.
    pub fn availability(&self) -> Vec<(ProviderKind, bool)> {
        self.adapters
            .iter()
            .map(|a| (a.kind(), a.is_available()))
            .collect()
    }

    pub async fn run(&self, request: OperationRequest) -> Result<OperationResult, AppError> {
        let task = request.payload.kind();
        match request.preference.pinned() {
            Some(kind) => self.run_pinned(kind, &request.payload).await,
            None => self.run_with_fallback(task, &request.payload).await,
        }
    }

    /// Tries exactly one provider; its failure is the request's failure.
    async fn run_pinned(
        &self,
        kind: ProviderKind,
        payload: &TaskPayload,
    ) -> Result<OperationResult, AppError> {
        let task = payload.kind();
        let adapter = self
            .adapters
            .iter()
            .find(|a| a.kind() == kind)
            .ok_or_else(|| AppError::ProviderUnavailable(format!("{kind}: not configured")))?;

        info!(%task, provider = %kind, "Running task on pinned provider");
        let (output, warnings) = self
            .attempt(adapter.as_ref(), payload)
            .await
            .map_err(|e| AppError::from_provider(kind, e))?;

        Ok(OperationResult {
            output,
            provider_used: Some(kind),
            warnings,
            degraded: false,
            attempts: vec![],
        })
    }

    async fn run_with_fallback(
        &self,
        task: TaskKind,
        payload: &TaskPayload,
    ) -> Result<OperationResult, AppError> {
        let mut attempts: Vec<FailedAttempt> = Vec::new();

        for adapter in &self.adapters {
            let provider = adapter.kind();
            let result = if adapter.is_available() {
                debug!(%task, %provider, "Trying provider");
                self.attempt(adapter.as_ref(), payload).await
            } else {
                Err(ProviderError::Unavailable("no credentials configured".to_string()))
            };

            match result {
                Ok((output, warnings)) => {
                    if !attempts.is_empty() {
                        info!(%task, %provider, failed = attempts.len(), "Provider succeeded after fallback");
                    }
                    return Ok(OperationResult {
                        output,
                        provider_used: Some(provider),
                        warnings,
                        degraded: false,
                        attempts,
                    });
                }
                Err(error) => {
                    warn!(%task, %provider, %error, "Provider attempt failed");
                    let fall_through = (self.should_fall_through)(task, &error);
                    attempts.push(FailedAttempt { provider, error });
                    if !fall_through {
                        break;
                    }
                }
            }
        }

        self.exhausted(payload, attempts)
    }

    /// Every allowed provider failed.
    ///
    /// When the whole chain was tried, parse degrades to a placeholder resume and a
    /// field rewrite degrades to the unchanged input. Everything else reports the last
    /// provider's error.
    fn exhausted(
        &self,
        payload: &TaskPayload,
        attempts: Vec<FailedAttempt>,
    ) -> Result<OperationResult, AppError> {
        let task = payload.kind();
        let summary: Vec<String> = attempts
            .iter()
            .map(|a| format!("{}: {}", a.provider, a.error))
            .collect();

        let whole_chain_failed = attempts.len() == self.adapters.len();

        match payload {
            TaskPayload::EnhanceText { text, .. } if whole_chain_failed => {
                warn!(attempts = ?summary, "All providers failed to rewrite text; returning it unchanged");
                return Ok(OperationResult {
                    output: TaskOutput::Text(text.clone()),
                    provider_used: None,
                    warnings: vec![
                        "All AI providers failed; the text was returned unchanged.".to_string(),
                    ],
                    degraded: true,
                    attempts,
                });
            }
            _ => {}
        }

        if task == TaskKind::Parse && whole_chain_failed {
            warn!(attempts = ?summary, "All providers failed to parse; returning placeholder resume");
            return Ok(OperationResult {
                output: TaskOutput::Resume {
                    resume: ResumeRecord::placeholder(),
                    missing_skills: true,
                },
                provider_used: None,
                warnings: vec![
                    "All AI providers failed; this is a placeholder resume. Please edit it manually."
                        .to_string(),
                    extraction::resume::SKILLS_INCOMPLETE_WARNING.to_string(),
                ],
                degraded: true,
                attempts,
            });
        }

        warn!(%task, attempts = ?summary, "All providers failed");
        match attempts.into_iter().last() {
            Some(last) => Err(AppError::from_provider(last.provider, last.error)),
            None => Err(AppError::ProviderUnavailable(
                "no AI providers are configured".to_string(),
            )),
        }
    }

    /// One provider call followed by extraction of its output.
    async fn attempt(
        &self,
        adapter: &dyn ProviderAdapter,
        payload: &TaskPayload,
    ) -> Result<(TaskOutput, Vec<String>), ProviderError> {
        let prompt = prompts::build_prompt(payload);
        let raw = adapter.invoke(payload.kind(), &prompt).await?;
        extract(payload, &raw).map_err(|e| ProviderError::MalformedResponse(e.to_string()))
    }
}

fn priority_index(kind: ProviderKind) -> usize {
    ProviderKind::PRIORITY
        .iter()
        .position(|k| *k == kind)
        .unwrap_or(usize::MAX)
}

/// Runs the extractor that matches the payload's task kind.
fn extract(
    payload: &TaskPayload,
    raw: &str,
) -> Result<(TaskOutput, Vec<String>), extraction::ExtractError> {
    let from_parsed = |parsed: ParsedResume| {
        (
            TaskOutput::Resume {
                resume: parsed.resume,
                missing_skills: parsed.missing_skills,
            },
            parsed.warnings,
        )
    };

    match payload {
        TaskPayload::Parse { text } => extraction::parse_resume(raw, text).map(from_parsed),
        TaskPayload::Enhance { resume, .. } => {
            extraction::parse_enhanced(raw, resume).map(from_parsed)
        }
        TaskPayload::GenerateDocument { .. } => {
            extract_latex_document(raw).map(|doc| (TaskOutput::Document(doc), vec![]))
        }
        TaskPayload::CoverLetter { .. } | TaskPayload::CareerObjective { .. } => {
            extract_plain_text(raw).map(|text| (TaskOutput::Text(text), vec![]))
        }
        TaskPayload::EnhanceText { .. } => {
            extract_enhanced_text(raw).map(|text| (TaskOutput::Text(text), vec![]))
        }
        TaskPayload::AchievementBullets { .. } => {
            extract_bullets(raw).map(|bullets| (TaskOutput::Bullets(bullets), vec![]))
        }
        TaskPayload::Chat { .. } => extract_document_update(raw).map(|update| {
            (
                TaskOutput::Chat {
                    reply: update.reply,
                    updated_document: update.document,
                },
                vec![],
            )
        }),
    }
}
