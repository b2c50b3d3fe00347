pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::chat::handlers as chat;
use crate::credits::handlers as credits;
use crate::resume::handlers as resume;
use crate::resume::upload::MAX_UPLOAD_BYTES;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Credits API
        .route("/api/v1/credits", get(credits::handle_get_balance))
        .route("/api/v1/credits/grant", post(credits::handle_grant))
        .route("/api/v1/credits/packages", get(credits::handle_list_packages))
        .route(
            "/api/v1/credits/packages/:id/grant",
            post(credits::handle_grant_package),
        )
        // Resume API
        .route("/api/v1/resumes/parse", post(resume::handle_parse))
        .route(
            "/api/v1/resumes/parse/upload",
            post(resume::handle_parse_upload)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 64 * 1024)),
        )
        .route("/api/v1/resumes/enhance", post(resume::handle_enhance))
        .route(
            "/api/v1/resumes/enhance-text",
            post(resume::handle_enhance_text),
        )
        .route(
            "/api/v1/resumes/achievement-bullets",
            post(resume::handle_achievement_bullets),
        )
        .route(
            "/api/v1/resumes/document",
            post(resume::handle_generate_document),
        )
        .route(
            "/api/v1/resumes/cover-letter",
            post(resume::handle_cover_letter),
        )
        .route(
            "/api/v1/resumes/objective",
            post(resume::handle_career_objective),
        )
        // Chat API
        .route("/api/v1/chat/sessions", post(chat::handle_open_session))
        .route(
            "/api/v1/chat/sessions/:id",
            get(chat::handle_get_session).delete(chat::handle_close_session),
        )
        .route(
            "/api/v1/chat/sessions/:id/messages",
            post(chat::handle_send_message),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::config::Config;
    use crate::credits::clock::FixedClock;
    use crate::credits::service::CreditService;
    use crate::credits::store::MemoryLedgerStore;
    use crate::orchestrator::testing::ScriptedAdapter;
    use crate::orchestrator::Orchestrator;
    use crate::providers::ProviderKind;

    fn app(adapter: ScriptedAdapter) -> Router {
        let credits = Arc::new(CreditService::new(
            Arc::new(MemoryLedgerStore::new()),
            Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap())),
        ));
        let orchestrator = Arc::new(Orchestrator::new(vec![Arc::new(adapter)]));
        build_router(AppState::new(orchestrator, credits, Config::for_tests()))
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(v) => Body::from(v.to_string()),
                None => Body::empty(),
            })
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health_lists_providers() {
        let app = app(ScriptedAdapter::unavailable(ProviderKind::Gemini));
        let (status, body) = call(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["providers"]["gemini"], false);
        assert_eq!(body["ledger_backend"], "memory");
    }

    #[tokio::test]
    async fn test_grant_then_balance() {
        let app = app(ScriptedAdapter::ok(ProviderKind::Gemini, "x"));
        let user = Uuid::new_v4();

        let (status, body) = call(
            &app,
            "POST",
            "/api/v1/credits/grant",
            Some(json!({"user_id": user, "amount": 10, "validity_days": 30})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_available"], 10);

        let (status, body) = call(&app, "GET", &format!("/api/v1/credits?user_id={user}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_available"], 10);
        assert_eq!(body["batches"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_zero_grant_is_bad_request() {
        let app = app(ScriptedAdapter::ok(ProviderKind::Gemini, "x"));
        let (status, body) = call(
            &app,
            "POST",
            "/api/v1/credits/grant",
            Some(json!({"user_id": Uuid::new_v4(), "amount": 0, "validity_days": 30})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_package_grant() {
        let app = app(ScriptedAdapter::ok(ProviderKind::Gemini, "x"));
        let (status, body) = call(&app, "GET", "/api/v1/credits/packages", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 3);

        let (status, body) = call(
            &app,
            "POST",
            "/api/v1/credits/packages/professional/grant",
            Some(json!({"user_id": Uuid::new_v4()})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_available"], 500);

        let (status, _) = call(
            &app,
            "POST",
            "/api/v1/credits/packages/platinum/grant",
            Some(json!({"user_id": Uuid::new_v4()})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_parse_without_credits_is_payment_required() {
        let app = app(ScriptedAdapter::ok(ProviderKind::Gemini, "x"));
        let (status, body) = call(
            &app,
            "POST",
            "/api/v1/resumes/parse",
            Some(json!({"user_id": Uuid::new_v4(), "text": "Jane Smith"})),
        )
        .await;
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(body["error"]["code"], "INSUFFICIENT_CREDITS");
    }

    #[tokio::test]
    async fn test_parse_round_trip() {
        let app = app(ScriptedAdapter::ok(
            ProviderKind::Gemini,
            r#"{"personal_info": {"name": "Jane Smith"}, "skills": ["Rust"]}"#,
        ));
        let user = Uuid::new_v4();
        call(
            &app,
            "POST",
            "/api/v1/credits/grant",
            Some(json!({"user_id": user, "amount": 1, "validity_days": 7})),
        )
        .await;

        let (status, body) = call(
            &app,
            "POST",
            "/api/v1/resumes/parse",
            Some(json!({"user_id": user, "text": "Jane Smith, Rust developer"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["resume"]["personal_info"]["name"], "Jane Smith");
        assert_eq!(body["provider_used"], "gemini");
        assert_eq!(body["degraded"], false);
    }

    async fn grant(app: &Router, user: Uuid, amount: u32) {
        let (status, _) = call(
            app,
            "POST",
            "/api/v1/credits/grant",
            Some(json!({"user_id": user, "amount": amount, "validity_days": 7})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_out_of_range_validity_is_bad_request() {
        let app = app(ScriptedAdapter::ok(ProviderKind::Gemini, "x"));
        let (status, body) = call(
            &app,
            "POST",
            "/api/v1/credits/grant",
            Some(json!({"user_id": Uuid::new_v4(), "amount": 1, "validity_days": u32::MAX})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_packages_list_prices() {
        let app = app(ScriptedAdapter::ok(ProviderKind::Gemini, "x"));
        let (status, body) = call(&app, "GET", "/api/v1/credits/packages", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["price"], 49);
        assert_eq!(body[0]["currency"], "INR");
    }

    #[tokio::test]
    async fn test_enhance_text_endpoint() {
        let app = app(ScriptedAdapter::ok(
            ProviderKind::Gemini,
            "DESIGNED AND SHIPPED THE SEARCH SERVICE.",
        ));
        let user = Uuid::new_v4();
        grant(&app, user, 1).await;

        let (status, body) = call(
            &app,
            "POST",
            "/api/v1/resumes/enhance-text",
            Some(json!({
                "user_id": user,
                "text": "DID SEARCH",
                "context": "experience description"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["text"], "Designed and shipped the search service.");
        assert_eq!(body["degraded"], false);

        let (status, _) = call(
            &app,
            "POST",
            "/api/v1/resumes/enhance-text",
            Some(json!({"user_id": user, "text": "again"})),
        )
        .await;
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    }

    #[tokio::test]
    async fn test_achievement_bullets_endpoint() {
        let app = app(ScriptedAdapter::ok(
            ProviderKind::Gemini,
            r#"["Launched the mobile app", "Grew retention"]"#,
        ));
        let user = Uuid::new_v4();
        grant(&app, user, 1).await;

        let (status, body) = call(
            &app,
            "POST",
            "/api/v1/resumes/achievement-bullets",
            Some(json!({
                "user_id": user,
                "description": "Launched the app, retention went up",
                "role": "Mobile Lead"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["bullets"], json!(["Launched the mobile app", "Grew retention"]));
        assert_eq!(body["provider_used"], "gemini");

        let (status, body) = call(
            &app,
            "POST",
            "/api/v1/resumes/achievement-bullets",
            Some(json!({"user_id": user, "description": " "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_enhance_accepts_optimization_options() {
        let app = app(ScriptedAdapter::ok(
            ProviderKind::Gemini,
            r#"{"personal_info": {"name": "Jane Smith"}, "skills": ["Rust"]}"#,
        ));
        let user = Uuid::new_v4();
        grant(&app, user, 1).await;

        let (status, body) = call(
            &app,
            "POST",
            "/api/v1/resumes/enhance",
            Some(json!({
                "user_id": user,
                "resume": {"personal_info": {"name": "Jane Smith"}, "skills": {"technical": ["Rust"]}},
                "options": {"target_role": "Staff Engineer", "focus_areas": ["leadership"]}
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["resume"]["skills"]["technical"], json!(["Rust"]));
    }

    #[tokio::test]
    async fn test_chat_session_lifecycle() {
        let app = app(ScriptedAdapter::ok(ProviderKind::Gemini, "Consider adding metrics."));
        let user = Uuid::new_v4();

        let (status, body) = call(
            &app,
            "POST",
            "/api/v1/chat/sessions",
            Some(json!({"user_id": user, "document": "\\documentclass{article}"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["id"].as_str().unwrap().to_string();

        let (status, body) = call(
            &app,
            "POST",
            &format!("/api/v1/chat/sessions/{id}/messages"),
            Some(json!({"user_id": user, "message": "Any tips?"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reply"], "Consider adding metrics.");
        assert_eq!(body["free_messages_remaining"], 2);
        assert!(body["updated_document"].is_null());

        let (status, _) = call(
            &app,
            "GET",
            &format!("/api/v1/chat/sessions/{id}?user_id={}", Uuid::new_v4()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(
            &app,
            "DELETE",
            &format!("/api/v1/chat/sessions/{id}?user_id={user}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
}
