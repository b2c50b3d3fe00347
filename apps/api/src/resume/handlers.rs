//! Axum route handlers for the Resume API.

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::resume::{ExperienceLevel, OptimizationOptions, ResumeRecord};
use crate::orchestrator::ProviderPreference;
use crate::resume::operations::{
    self, BulletsResponse, DocumentResponse, EnhancedTextResponse, ResumeResponse, TextResponse,
};
use crate::resume::upload::{extract_text, read_upload};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ParseRequest {
    pub user_id: Uuid,
    pub text: String,
    #[serde(default)]
    pub provider_preference: ProviderPreference,
}

#[derive(Debug, Deserialize)]
pub struct EnhanceRequest {
    pub user_id: Uuid,
    pub resume: ResumeRecord,
    #[serde(default)]
    pub options: OptimizationOptions,
    #[serde(default)]
    pub provider_preference: ProviderPreference,
}

#[derive(Debug, Deserialize)]
pub struct DocumentRequest {
    pub user_id: Uuid,
    pub resume: ResumeRecord,
    #[serde(default)]
    pub experience_level: ExperienceLevel,
    #[serde(default)]
    pub provider_preference: ProviderPreference,
}

#[derive(Debug, Deserialize)]
pub struct CoverLetterRequest {
    pub user_id: Uuid,
    pub resume: ResumeRecord,
    pub job_description: String,
    #[serde(default)]
    pub provider_preference: ProviderPreference,
}

#[derive(Debug, Deserialize)]
pub struct ObjectiveRequest {
    pub user_id: Uuid,
    pub resume: ResumeRecord,
    #[serde(default)]
    pub target_role: Option<String>,
    #[serde(default)]
    pub provider_preference: ProviderPreference,
}

#[derive(Debug, Deserialize)]
pub struct EnhanceTextRequest {
    pub user_id: Uuid,
    pub text: String,
    /// What the text is, e.g. "experience description for Senior Engineer".
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub provider_preference: ProviderPreference,
}

#[derive(Debug, Deserialize)]
pub struct BulletsRequest {
    pub user_id: Uuid,
    pub description: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub provider_preference: ProviderPreference,
}

/// POST /api/v1/resumes/parse
pub async fn handle_parse(
    State(state): State<AppState>,
    Json(req): Json<ParseRequest>,
) -> Result<Json<ResumeResponse>, AppError> {
    let response = operations::parse(
        &state.orchestrator,
        &state.credits,
        req.user_id,
        &req.text,
        req.provider_preference,
    )
    .await?;
    Ok(Json(response))
}

/// POST /api/v1/resumes/parse/upload (multipart: user_id, file, provider_preference?)
pub async fn handle_parse_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ResumeResponse>, AppError> {
    let upload = read_upload(multipart).await?;
    let user_id = upload.user_id;
    let preference = upload.preference;

    // PDF decoding is CPU-bound and can panic on hostile input.
    let text = tokio::task::spawn_blocking(move || extract_text(&upload))
        .await
        .map_err(|_| AppError::Validation("Could not read the uploaded file".to_string()))??;

    let response =
        operations::parse(&state.orchestrator, &state.credits, user_id, &text, preference).await?;
    Ok(Json(response))
}

/// POST /api/v1/resumes/enhance
pub async fn handle_enhance(
    State(state): State<AppState>,
    Json(req): Json<EnhanceRequest>,
) -> Result<Json<ResumeResponse>, AppError> {
    let response = operations::enhance(
        &state.orchestrator,
        &state.credits,
        req.user_id,
        req.resume,
        req.options,
        req.provider_preference,
    )
    .await?;
    Ok(Json(response))
}

/// POST /api/v1/resumes/enhance-text
pub async fn handle_enhance_text(
    State(state): State<AppState>,
    Json(req): Json<EnhanceTextRequest>,
) -> Result<Json<EnhancedTextResponse>, AppError> {
    let response = operations::enhance_text(
        &state.orchestrator,
        &state.credits,
        req.user_id,
        &req.text,
        &req.context,
        req.provider_preference,
    )
    .await?;
    Ok(Json(response))
}

/// POST /api/v1/resumes/achievement-bullets
pub async fn handle_achievement_bullets(
    State(state): State<AppState>,
    Json(req): Json<BulletsRequest>,
) -> Result<Json<BulletsResponse>, AppError> {
    let response = operations::achievement_bullets(
        &state.orchestrator,
        &state.credits,
        req.user_id,
        &req.description,
        &req.role,
        req.provider_preference,
    )
    .await?;
    Ok(Json(response))
}

/// POST /api/v1/resumes/document
pub async fn handle_generate_document(
    State(state): State<AppState>,
    Json(req): Json<DocumentRequest>,
) -> Result<Json<DocumentResponse>, AppError> {
    let response = operations::generate_document(
        &state.orchestrator,
        &state.credits,
        req.user_id,
        req.resume,
        req.experience_level,
        req.provider_preference,
    )
    .await?;
    Ok(Json(response))
}

/// POST /api/v1/resumes/cover-letter
pub async fn handle_cover_letter(
    State(state): State<AppState>,
    Json(req): Json<CoverLetterRequest>,
) -> Result<Json<TextResponse>, AppError> {
    let response = operations::cover_letter(
        &state.orchestrator,
        &state.credits,
        req.user_id,
        req.resume,
        &req.job_description,
        req.provider_preference,
    )
    .await?;
    Ok(Json(response))
}

/// POST /api/v1/resumes/objective
pub async fn handle_career_objective(
    State(state): State<AppState>,
    Json(req): Json<ObjectiveRequest>,
) -> Result<Json<TextResponse>, AppError> {
    let response = operations::career_objective(
        &state.orchestrator,
        &state.credits,
        req.user_id,
        req.resume,
        req.target_role,
        req.provider_preference,
    )
    .await?;
    Ok(Json(response))
}
