//! Axum route handlers for chat sessions.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::chat::{ChatSessionView, ChatTurn};
use crate::credits::handlers::UserIdQuery;
use crate::errors::AppError;
use crate::orchestrator::ProviderPreference;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OpenSessionRequest {
    pub user_id: Uuid,
    /// The LaTeX document the conversation edits.
    pub document: String,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub user_id: Uuid,
    pub message: String,
    #[serde(default)]
    pub provider_preference: ProviderPreference,
}

/// POST /api/v1/chat/sessions
pub async fn handle_open_session(
    State(state): State<AppState>,
    Json(req): Json<OpenSessionRequest>,
) -> Result<(StatusCode, Json<ChatSessionView>), AppError> {
    let view = state.chats.open(req.user_id, req.document).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/v1/chat/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<ChatSessionView>, AppError> {
    Ok(Json(state.chats.get(session_id, params.user_id).await?))
}

/// POST /api/v1/chat/sessions/:id/messages
pub async fn handle_send_message(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<ChatTurn>, AppError> {
    let turn = state
        .chats
        .send_message(session_id, req.user_id, &req.message, req.provider_preference)
        .await?;
    Ok(Json(turn))
}

/// DELETE /api/v1/chat/sessions/:id
pub async fn handle_close_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<StatusCode, AppError> {
    state.chats.close(session_id, params.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
