use std::sync::Arc;
use std::time::Duration;

use crate::chat::ChatSessions;
use crate::config::Config;
use crate::credits::service::CreditService;
use crate::orchestrator::Orchestrator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Owns the provider adapters; the only path to an AI backend.
    pub orchestrator: Arc<Orchestrator>,
    pub credits: Arc<CreditService>,
    /// Live chat sessions. In-memory only, swept when idle.
    pub chats: Arc<ChatSessions>,
    pub config: Config,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>, credits: Arc<CreditService>, config: Config) -> Self {
        let chats = Arc::new(ChatSessions::new(
            orchestrator.clone(),
            credits.clone(),
            Duration::from_secs(config.chat_idle_timeout_secs),
        ));
        Self {
            orchestrator,
            credits,
            chats,
            config,
        }
    }
}
