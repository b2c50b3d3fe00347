use axum::{extract::State, Json};
use serde_json::{json, Map, Value};

use crate::state::AppState;

/// GET /health
/// Returns service status, version, ledger backend and which providers have credentials.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let providers: Map<String, Value> = state
        .orchestrator
        .availability()
        .into_iter()
        .map(|(kind, available)| (kind.to_string(), Value::Bool(available)))
        .collect();

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "resumecraft-api",
        "ledger_backend": format!("{:?}", state.config.ledger_backend).to_lowercase(),
        "providers": providers,
    }))
}
