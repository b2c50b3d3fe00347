//! Axum route handlers for the Credits API.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::credits::packages::{find_package, CREDIT_PACKAGES};
use crate::credits::service::LedgerSnapshot;
use crate::errors::AppError;
use crate::models::credits::CreditPackage;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct GrantRequest {
    pub user_id: Uuid,
    pub amount: u32,
    pub validity_days: u32,
}

#[derive(Debug, Deserialize)]
pub struct PackageGrantRequest {
    pub user_id: Uuid,
}

/// GET /api/v1/credits
pub async fn handle_get_balance(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<LedgerSnapshot>, AppError> {
    Ok(Json(state.credits.balance(params.user_id).await?))
}

/// POST /api/v1/credits/grant
pub async fn handle_grant(
    State(state): State<AppState>,
    Json(req): Json<GrantRequest>,
) -> Result<Json<LedgerSnapshot>, AppError> {
    let snapshot = state
        .credits
        .grant(req.user_id, req.amount, req.validity_days)
        .await?;
    Ok(Json(snapshot))
}

/// GET /api/v1/credits/packages
pub async fn handle_list_packages() -> Json<&'static [CreditPackage]> {
    Json(CREDIT_PACKAGES)
}

/// POST /api/v1/credits/packages/:id/grant
pub async fn handle_grant_package(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<PackageGrantRequest>,
) -> Result<Json<LedgerSnapshot>, AppError> {
    let package =
        find_package(&id).ok_or_else(|| AppError::NotFound(format!("Package {id} not found")))?;
    let snapshot = state
        .credits
        .grant(req.user_id, package.credits, package.validity_days)
        .await?;
    Ok(Json(snapshot))
}
