//! Chat Session: conversational editing of a generated document.
//!
//! Each session starts with `FREE_MESSAGES_PER_SESSION` free sends. After that every
//! send costs `CREDITS_PER_PAID_MESSAGE`, debited in one step before any provider is
//! called. Sessions live in memory only. They are discarded on DELETE, on shutdown, or
//! by the idle sweeper once untouched for longer than the configured idle timeout.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::credits::service::CreditService;
use crate::errors::AppError;
use crate::models::chat::ChatMessage;
use crate::orchestrator::{
    OperationRequest, Orchestrator, ProviderPreference, TaskOutput, TaskPayload,
};
use crate::providers::ProviderKind;

pub mod handlers;
pub mod prompts;

pub const FREE_MESSAGES_PER_SESSION: u32 = 3;
pub const CREDITS_PER_PAID_MESSAGE: u32 = 2;

/// How often the idle sweeper wakes up.
pub const SWEEP_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct ChatSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub document: String,
    pub messages: Vec<ChatMessage>,
    pub free_messages_remaining: u32,
    last_active: Instant,
}

impl ChatSession {
    fn new(user_id: Uuid, document: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            document,
            messages: vec![ChatMessage::assistant(prompts::CHAT_GREETING)],
            free_messages_remaining: FREE_MESSAGES_PER_SESSION,
            last_active: Instant::now(),
        }
    }

    fn view(&self) -> ChatSessionView {
        ChatSessionView {
            id: self.id,
            document: self.document.clone(),
            messages: self.messages.clone(),
            free_messages_remaining: self.free_messages_remaining,
        }
    }
}

/// What callers see of a session.
#[derive(Debug, Clone, Serialize)]
pub struct ChatSessionView {
    pub id: Uuid,
    pub document: String,
    pub messages: Vec<ChatMessage>,
    pub free_messages_remaining: u32,
}

/// Outcome of one send.
#[derive(Debug, Clone, Serialize)]
pub struct ChatTurn {
    pub reply: String,
    /// Present only when the reply carried a full-document update.
    pub updated_document: Option<String>,
    pub free_messages_remaining: u32,
    pub credits_charged: u32,
    pub provider_used: Option<ProviderKind>,
}

/// Registry of live sessions. Sends on one session are serialized by its mutex.
pub struct ChatSessions {
    orchestrator: Arc<Orchestrator>,
    credits: Arc<CreditService>,
    sessions: DashMap<Uuid, Arc<Mutex<ChatSession>>>,
    idle_timeout: Duration,
}

impl ChatSessions {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        credits: Arc<CreditService>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            orchestrator,
            credits,
            sessions: DashMap::new(),
            idle_timeout,
        }
    }

    /// Drops sessions idle for longer than the timeout. Sessions whose mutex is held
    /// are in use and always kept. Returns how many were dropped.
    pub fn sweep_idle(&self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, handle| match handle.try_lock() {
            Ok(session) => session.last_active.elapsed() <= self.idle_timeout,
            Err(_) => true,
        });
        let dropped = before.saturating_sub(self.sessions.len());
        if dropped > 0 {
            info!("Dropped {dropped} idle chat session(s)");
        }
        dropped
    }

    /// Runs `sweep_idle` every `SWEEP_INTERVAL_SECS` for the life of the process.
    pub fn spawn_idle_sweeper(self: &Arc<Self>) {
        let chats = Arc::clone(self);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(SWEEP_INTERVAL_SECS));
            loop {
                tick.tick().await;
                chats.sweep_idle();
            }
        });
        debug!("Chat idle sweeper started (timeout {:?})", self.idle_timeout);
    }

    pub async fn open(&self, user_id: Uuid, document: String) -> Result<ChatSessionView, AppError> {
        if document.trim().is_empty() {
            return Err(AppError::Validation(
                "A document is required to start a chat".to_string(),
            ));
        }
        let session = ChatSession::new(user_id, document);
        let view = session.view();
        self.sessions
            .insert(session.id, Arc::new(Mutex::new(session)));
        info!("Opened chat session {} for user {user_id}", view.id);
        Ok(view)
    }

    pub async fn get(&self, session_id: Uuid, user_id: Uuid) -> Result<ChatSessionView, AppError> {
        let handle = self.owned_session(session_id, user_id).await?;
        let mut session = handle.lock().await;
        session.last_active = Instant::now();
        Ok(session.view())
    }

    pub async fn close(&self, session_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        // Ownership check first so another user cannot end the session.
        self.owned_session(session_id, user_id).await?;
        self.sessions.remove(&session_id);
        info!("Closed chat session {session_id}");
        Ok(())
    }

    /// Sends one user message and records the assistant's reply.
    ///
    /// On provider failure the user message stays in the history, no reply is
    /// recorded and the consumed free message or credits are not returned.
    pub async fn send_message(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        text: &str,
        preference: ProviderPreference,
    ) -> Result<ChatTurn, AppError> {
        let handle = self.owned_session(session_id, user_id).await?;
        let mut session = handle.lock().await;
        session.last_active = Instant::now();

        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::Validation("Message cannot be empty".to_string()));
        }

        let credits_charged = if session.free_messages_remaining > 0 {
            session.free_messages_remaining -= 1;
            0
        } else {
            self.credits
                .charge(user_id, CREDITS_PER_PAID_MESSAGE)
                .await?;
            CREDITS_PER_PAID_MESSAGE
        };

        let payload = TaskPayload::Chat {
            document: session.document.clone(),
            history: session.messages.clone(),
            message: text.to_string(),
        };
        session.messages.push(ChatMessage::user(text));

        let result = match self
            .orchestrator
            .run(OperationRequest::new(payload, preference))
            .await
        {
            Ok(result) => result,
            Err(e) => {
                warn!("Chat turn failed for session {session_id}: {e}");
                return Err(e);
            }
        };

        let TaskOutput::Chat {
            reply,
            updated_document,
        } = result.output
        else {
            return Err(AppError::Internal(anyhow::anyhow!(
                "chat task produced a non-chat output"
            )));
        };

        session.messages.push(ChatMessage::assistant(reply.clone()));
        if let Some(document) = &updated_document {
            session.document = document.clone();
            info!("Chat session {session_id} replaced its document");
        }

        Ok(ChatTurn {
            reply,
            updated_document,
            free_messages_remaining: session.free_messages_remaining,
            credits_charged,
            provider_used: result.provider_used,
        })
    }

    /// Looks up a session, hiding sessions owned by other users.
    async fn owned_session(
        &self,
        session_id: Uuid,
        user_id: Uuid,
    ) -> Result<Arc<Mutex<ChatSession>>, AppError> {
        let not_found = || AppError::NotFound(format!("Chat session {session_id} not found"));
        let handle = self
            .sessions
            .get(&session_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(not_found)?;
        if handle.lock().await.user_id != user_id {
            return Err(not_found());
        }
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credits::clock::FixedClock;
    use crate::credits::store::MemoryLedgerStore;
    use crate::extraction::document::UPDATED_DOCUMENT_NOTE;
    use crate::extraction::{FULL_DOCUMENT_END, FULL_DOCUMENT_START};
    use crate::orchestrator::testing::ScriptedAdapter;
    use crate::providers::ProviderError;
    use chrono::{TimeZone, Utc};

    const IDLE: Duration = Duration::from_secs(30 * 60);

    struct Harness {
        chats: ChatSessions,
        credits: Arc<CreditService>,
        adapter: Arc<ScriptedAdapter>,
        user: Uuid,
    }

    fn harness(adapter: ScriptedAdapter) -> Harness {
        let adapter = Arc::new(adapter);
        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
        let credits = Arc::new(CreditService::new(
            Arc::new(MemoryLedgerStore::new()),
            Arc::new(clock),
        ));
        let orchestrator = Arc::new(Orchestrator::new(vec![adapter.clone()]));
        Harness {
            chats: ChatSessions::new(orchestrator, credits.clone(), IDLE),
            credits,
            adapter,
            user: Uuid::new_v4(),
        }
    }

    async fn send(h: &Harness, id: Uuid, text: &str) -> Result<ChatTurn, AppError> {
        h.chats
            .send_message(id, h.user, text, ProviderPreference::Auto)
            .await
    }

    #[tokio::test]
    async fn test_session_starts_with_greeting_and_three_free() {
        let h = harness(ScriptedAdapter::ok(ProviderKind::Gemini, "ok"));
        let view = h.chats.open(h.user, "doc".to_string()).await.unwrap();
        assert_eq!(view.free_messages_remaining, 3);
        assert_eq!(view.messages, vec![ChatMessage::assistant(prompts::CHAT_GREETING)]);
    }

    #[tokio::test]
    async fn test_fourth_send_debits_exactly_two() {
        let h = harness(ScriptedAdapter::ok(ProviderKind::Gemini, "Looks good."));
        h.credits.grant(h.user, 5, 30).await.unwrap();
        let id = h.chats.open(h.user, "doc".to_string()).await.unwrap().id;

        for remaining in [2, 1, 0] {
            let turn = send(&h, id, "tweak").await.unwrap();
            assert_eq!(turn.free_messages_remaining, remaining);
            assert_eq!(turn.credits_charged, 0);
        }
        assert_eq!(h.credits.balance(h.user).await.unwrap().total_available, 5);

        let turn = send(&h, id, "tweak again").await.unwrap();
        assert_eq!(turn.credits_charged, 2);
        assert_eq!(h.credits.balance(h.user).await.unwrap().total_available, 3);
    }

    #[tokio::test]
    async fn test_insufficient_credits_rejects_without_provider_call() {
        let h = harness(ScriptedAdapter::ok(ProviderKind::Gemini, "ok"));
        h.credits.grant(h.user, 1, 30).await.unwrap();
        let id = h.chats.open(h.user, "doc".to_string()).await.unwrap().id;
        for _ in 0..3 {
            send(&h, id, "hi").await.unwrap();
        }
        assert_eq!(h.adapter.calls(), 3);

        let err = send(&h, id, "one more").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::InsufficientCredits {
                required: 2,
                available: 1
            }
        ));
        assert_eq!(h.adapter.calls(), 3);
        assert_eq!(h.credits.balance(h.user).await.unwrap().total_available, 1);

        // greeting + 3 exchanges; the rejected message is not recorded
        let view = h.chats.get(id, h.user).await.unwrap();
        assert_eq!(view.messages.len(), 7);
    }

    #[tokio::test]
    async fn test_empty_message_is_validation_error_and_free() {
        let h = harness(ScriptedAdapter::ok(ProviderKind::Gemini, "ok"));
        let id = h.chats.open(h.user, "doc".to_string()).await.unwrap().id;

        let err = send(&h, id, "   ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let view = h.chats.get(id, h.user).await.unwrap();
        assert_eq!(view.free_messages_remaining, 3);
        assert_eq!(h.adapter.calls(), 0);
    }

    #[tokio::test]
    async fn test_document_update_replaces_session_document() {
        let reply = format!(
            "Fixed the header.\n{FULL_DOCUMENT_START}\\documentclass{{article}} new{FULL_DOCUMENT_END}"
        );
        let h = harness(ScriptedAdapter::ok(ProviderKind::Gemini, &reply));
        let id = h.chats.open(h.user, "old doc".to_string()).await.unwrap().id;

        let turn = send(&h, id, "fix header").await.unwrap();
        assert_eq!(
            turn.updated_document.as_deref(),
            Some("\\documentclass{article} new")
        );
        assert!(turn.reply.ends_with(UPDATED_DOCUMENT_NOTE));

        let view = h.chats.get(id, h.user).await.unwrap();
        assert_eq!(view.document, "\\documentclass{article} new");
        assert_eq!(view.messages.last().unwrap().content, turn.reply);
    }

    #[tokio::test]
    async fn test_history_is_appended_in_order_and_sent_to_provider() {
        let h = harness(
            ScriptedAdapter::ok(ProviderKind::Gemini, "second reply")
                .then(Ok("first reply".to_string())),
        );
        let id = h.chats.open(h.user, "doc".to_string()).await.unwrap().id;
        send(&h, id, "first").await.unwrap();
        send(&h, id, "second").await.unwrap();

        let view = h.chats.get(id, h.user).await.unwrap();
        let contents: Vec<&str> = view.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(
            contents,
            vec![prompts::CHAT_GREETING, "first", "first reply", "second", "second reply"]
        );
        let prompt = h.adapter.last_prompt().unwrap();
        assert!(prompt.user.contains("User: first"));
        assert!(prompt.user.contains("Assistant: first reply"));
    }

    #[tokio::test]
    async fn test_provider_failure_keeps_user_message_only() {
        let h = harness(ScriptedAdapter::failing(
            ProviderKind::Gemini,
            ProviderError::Transient("timeout".to_string()),
        ));
        let id = h.chats.open(h.user, "doc".to_string()).await.unwrap().id;

        assert!(send(&h, id, "help").await.is_err());
        let view = h.chats.get(id, h.user).await.unwrap();
        assert_eq!(view.messages.len(), 2);
        assert_eq!(view.messages[1], ChatMessage::user("help"));
        assert_eq!(view.free_messages_remaining, 2);
    }

    #[tokio::test]
    async fn test_malformed_markers_fail_the_turn() {
        let reply = format!("Here {FULL_DOCUMENT_START} half a document");
        let h = harness(ScriptedAdapter::ok(ProviderKind::Gemini, &reply));
        let id = h.chats.open(h.user, "doc".to_string()).await.unwrap().id;

        let err = send(&h, id, "rewrite").await.unwrap_err();
        assert!(matches!(err, AppError::MalformedResponse(_)));
        assert_eq!(h.chats.get(id, h.user).await.unwrap().document, "doc");
    }

    #[tokio::test]
    async fn test_other_users_cannot_see_or_close_session() {
        let h = harness(ScriptedAdapter::ok(ProviderKind::Gemini, "ok"));
        let id = h.chats.open(h.user, "doc".to_string()).await.unwrap().id;
        let stranger = Uuid::new_v4();

        assert!(matches!(
            h.chats.get(id, stranger).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            h.chats.close(id, stranger).await,
            Err(AppError::NotFound(_))
        ));
        h.chats.close(id, h.user).await.unwrap();
        assert!(matches!(
            h.chats.get(id, h.user).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_open_requires_document() {
        let h = harness(ScriptedAdapter::ok(ProviderKind::Gemini, "ok"));
        assert!(matches!(
            h.chats.open(h.user, " ".to_string()).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_sessions_are_swept_and_active_ones_kept() {
        let h = harness(ScriptedAdapter::ok(ProviderKind::Gemini, "ok"));
        let stale = h.chats.open(h.user, "doc".to_string()).await.unwrap().id;
        let active = h.chats.open(h.user, "doc".to_string()).await.unwrap().id;

        tokio::time::advance(Duration::from_secs(20 * 60)).await;
        h.chats.get(active, h.user).await.unwrap();
        tokio::time::advance(Duration::from_secs(15 * 60)).await;

        assert_eq!(h.chats.sweep_idle(), 1);
        assert!(matches!(
            h.chats.get(stale, h.user).await,
            Err(AppError::NotFound(_))
        ));
        assert!(h.chats.get(active, h.user).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_in_use_is_not_swept() {
        let h = harness(ScriptedAdapter::ok(ProviderKind::Gemini, "ok"));
        let id = h.chats.open(h.user, "doc".to_string()).await.unwrap().id;
        tokio::time::advance(IDLE * 2).await;

        let handle = h.chats.sessions.get(&id).map(|e| Arc::clone(e.value())).unwrap();
        let held = handle.lock().await;
        assert_eq!(h.chats.sweep_idle(), 0);
        drop(held);
        assert_eq!(h.chats.sweep_idle(), 1);
    }
}
