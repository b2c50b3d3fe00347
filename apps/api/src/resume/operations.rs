//! Charged AI operations on resumes.
//!
//! Every operation validates its input, charges `AI_OPERATION_COST` and only then runs
//! the orchestrator. Invalid input is never charged; a charged operation that fails
//! downstream is not refunded.

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::credits::service::{CreditService, AI_OPERATION_COST};
use crate::errors::AppError;
use crate::models::resume::{ExperienceLevel, OptimizationOptions, ResumeRecord};
use crate::orchestrator::{
    OperationRequest, OperationResult, Orchestrator, ProviderPreference, TaskOutput, TaskPayload,
};
use crate::providers::ProviderKind;

#[derive(Debug, Clone, Serialize)]
pub struct ResumeResponse {
    pub resume: ResumeRecord,
    pub missing_skills: bool,
    pub warnings: Vec<String>,
    pub provider_used: Option<ProviderKind>,
    pub degraded: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentResponse {
    pub latex: String,
    pub provider_used: Option<ProviderKind>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextResponse {
    pub text: String,
    pub provider_used: Option<ProviderKind>,
}

/// A rewritten field. `degraded` means every provider failed and `text` is the input.
#[derive(Debug, Clone, Serialize)]
pub struct EnhancedTextResponse {
    pub text: String,
    pub provider_used: Option<ProviderKind>,
    pub degraded: bool,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulletsResponse {
    pub bullets: Vec<String>,
    pub provider_used: Option<ProviderKind>,
}

pub async fn parse(
    orchestrator: &Orchestrator,
    credits: &CreditService,
    user_id: Uuid,
    text: &str,
    preference: ProviderPreference,
) -> Result<ResumeResponse, AppError> {
    if text.trim().is_empty() {
        return Err(AppError::Validation("Resume text cannot be empty".to_string()));
    }
    let payload = TaskPayload::Parse {
        text: text.to_string(),
    };
    let result = charge_and_run(orchestrator, credits, user_id, payload, preference).await?;
    into_resume_response(result)
}

pub async fn enhance(
    orchestrator: &Orchestrator,
    credits: &CreditService,
    user_id: Uuid,
    resume: ResumeRecord,
    options: OptimizationOptions,
    preference: ProviderPreference,
) -> Result<ResumeResponse, AppError> {
    resume.validate()?;
    let payload = TaskPayload::Enhance { resume, options };
    let result = charge_and_run(orchestrator, credits, user_id, payload, preference).await?;
    into_resume_response(result)
}

pub async fn generate_document(
    orchestrator: &Orchestrator,
    credits: &CreditService,
    user_id: Uuid,
    resume: ResumeRecord,
    experience_level: ExperienceLevel,
    preference: ProviderPreference,
) -> Result<DocumentResponse, AppError> {
    resume.validate()?;
    let payload = TaskPayload::GenerateDocument {
        resume,
        experience_level,
    };
    let result = charge_and_run(orchestrator, credits, user_id, payload, preference).await?;
    match result.output {
        TaskOutput::Document(latex) => Ok(DocumentResponse {
            latex,
            provider_used: result.provider_used,
        }),
        other => Err(unexpected_output(other)),
    }
}

pub async fn cover_letter(
    orchestrator: &Orchestrator,
    credits: &CreditService,
    user_id: Uuid,
    resume: ResumeRecord,
    job_description: &str,
    preference: ProviderPreference,
) -> Result<TextResponse, AppError> {
    resume.validate()?;
    if job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "A job description is required for a cover letter".to_string(),
        ));
    }
    let payload = TaskPayload::CoverLetter {
        resume,
        job_description: job_description.to_string(),
    };
    let result = charge_and_run(orchestrator, credits, user_id, payload, preference).await?;
    into_text_response(result)
}

pub async fn career_objective(
    orchestrator: &Orchestrator,
    credits: &CreditService,
    user_id: Uuid,
    resume: ResumeRecord,
    target_role: Option<String>,
    preference: ProviderPreference,
) -> Result<TextResponse, AppError> {
    resume.validate()?;
    let target_role = target_role.filter(|r| !r.trim().is_empty());
    let payload = TaskPayload::CareerObjective {
        resume,
        target_role,
    };
    let result = charge_and_run(orchestrator, credits, user_id, payload, preference).await?;
    into_text_response(result)
}

pub async fn enhance_text(
    orchestrator: &Orchestrator,
    credits: &CreditService,
    user_id: Uuid,
    text: &str,
    context: &str,
    preference: ProviderPreference,
) -> Result<EnhancedTextResponse, AppError> {
    if text.trim().is_empty() {
        return Err(AppError::Validation("Text to enhance cannot be empty".to_string()));
    }
    let payload = TaskPayload::EnhanceText {
        text: text.to_string(),
        context: context.to_string(),
    };
    let result = charge_and_run(orchestrator, credits, user_id, payload, preference).await?;
    match result.output {
        TaskOutput::Text(text) => Ok(EnhancedTextResponse {
            text,
            provider_used: result.provider_used,
            degraded: result.degraded,
            warnings: result.warnings,
        }),
        other => Err(unexpected_output(other)),
    }
}

pub async fn achievement_bullets(
    orchestrator: &Orchestrator,
    credits: &CreditService,
    user_id: Uuid,
    description: &str,
    role: &str,
    preference: ProviderPreference,
) -> Result<BulletsResponse, AppError> {
    if description.trim().is_empty() {
        return Err(AppError::Validation(
            "A description is required to write bullet points".to_string(),
        ));
    }
    let payload = TaskPayload::AchievementBullets {
        description: description.to_string(),
        role: role.to_string(),
    };
    let result = charge_and_run(orchestrator, credits, user_id, payload, preference).await?;
    match result.output {
        TaskOutput::Bullets(bullets) => Ok(BulletsResponse {
            bullets,
            provider_used: result.provider_used,
        }),
        other => Err(unexpected_output(other)),
    }
}

async fn charge_and_run(
    orchestrator: &Orchestrator,
    credits: &CreditService,
    user_id: Uuid,
    payload: TaskPayload,
    preference: ProviderPreference,
) -> Result<OperationResult, AppError> {
    let task = payload.kind();
    credits.charge(user_id, AI_OPERATION_COST).await?;
    let result = orchestrator
        .run(OperationRequest::new(payload, preference))
        .await?;
    let failed: Vec<ProviderKind> = result.attempts.iter().map(|a| a.provider).collect();
    info!(
        %task,
        provider = ?result.provider_used,
        degraded = result.degraded,
        failed = ?failed,
        "AI operation completed for user {user_id}"
    );
    Ok(result)
}

fn into_resume_response(result: OperationResult) -> Result<ResumeResponse, AppError> {
    match result.output {
        TaskOutput::Resume {
            resume,
            missing_skills,
        } => Ok(ResumeResponse {
            resume,
            missing_skills,
            warnings: result.warnings,
            provider_used: result.provider_used,
            degraded: result.degraded,
        }),
        other => Err(unexpected_output(other)),
    }
}

fn into_text_response(result: OperationResult) -> Result<TextResponse, AppError> {
    match result.output {
        TaskOutput::Text(text) => Ok(TextResponse {
            text,
            provider_used: result.provider_used,
        }),
        other => Err(unexpected_output(other)),
    }
}

fn unexpected_output(output: TaskOutput) -> AppError {
    AppError::Internal(anyhow::anyhow!("unexpected task output: {output:?}"))
}
