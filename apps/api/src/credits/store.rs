//! Ledger persistence.
//!
//! Every backend stores one JSON array per user under `credits_<user_id>`.
//! Writes are last-write-wins; cross-process locking is not attempted.

use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use redis::AsyncCommands;
use sqlx::PgPool;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::credits::ledger::CreditLedger;
use crate::errors::AppError;

/// Storage seam for credit ledgers. `AppState` holds an `Arc<dyn LedgerStore>` chosen
/// at startup from `LEDGER_BACKEND`.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Returns the user's ledger, or an empty one if nothing was saved yet.
    async fn load(&self, user_id: Uuid) -> Result<CreditLedger, AppError>;

    async fn save(&self, user_id: Uuid, ledger: &CreditLedger) -> Result<(), AppError>;
}

pub fn ledger_key(user_id: Uuid) -> String {
    format!("credits_{user_id}")
}

fn decode(key: &str, raw: &str) -> Result<CreditLedger, AppError> {
    let ledger = serde_json::from_str(raw)
        .with_context(|| format!("Stored ledger at '{key}' is not a valid batch array"))?;
    Ok(ledger)
}

fn encode(ledger: &CreditLedger) -> Result<String, AppError> {
    Ok(serde_json::to_string(ledger).context("Failed to serialize ledger")?)
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory backend
// ────────────────────────────────────────────────────────────────────────────

/// Process-local key-value map. Default backend for development and tests.
#[derive(Default)]
pub struct MemoryLedgerStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn load(&self, user_id: Uuid) -> Result<CreditLedger, AppError> {
        let key = ledger_key(user_id);
        match self.entries.read().await.get(&key) {
            Some(raw) => decode(&key, raw),
            None => Ok(CreditLedger::default()),
        }
    }

    async fn save(&self, user_id: Uuid, ledger: &CreditLedger) -> Result<(), AppError> {
        let payload = encode(ledger)?;
        self.entries
            .write()
            .await
            .insert(ledger_key(user_id), payload);
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Redis backend
// ────────────────────────────────────────────────────────────────────────────

pub struct RedisLedgerStore {
    client: redis::Client,
}

impl RedisLedgerStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LedgerStore for RedisLedgerStore {
    async fn load(&self, user_id: Uuid) -> Result<CreditLedger, AppError> {
        let key = ledger_key(user_id);
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: Option<String> = conn.get(&key).await?;
        match raw {
            Some(raw) => decode(&key, &raw),
            None => Ok(CreditLedger::default()),
        }
    }

    async fn save(&self, user_id: Uuid, ledger: &CreditLedger) -> Result<(), AppError> {
        let key = ledger_key(user_id);
        let payload = encode(ledger)?;
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set::<_, _, ()>(&key, payload).await?;
        debug!("Saved ledger {key} to Redis");
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Postgres backend
// ────────────────────────────────────────────────────────────────────────────

pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the key-value table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), AppError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ledger_entries (
                key        TEXT PRIMARY KEY,
                value      JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        info!("ledger_entries table ready");
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn load(&self, user_id: Uuid) -> Result<CreditLedger, AppError> {
        let key = ledger_key(user_id);
        let value: Option<serde_json::Value> =
            sqlx::query_scalar("SELECT value FROM ledger_entries WHERE key = $1")
                .bind(&key)
                .fetch_optional(&self.pool)
                .await?;
        match value {
            Some(value) => Ok(serde_json::from_value(value)
                .with_context(|| format!("Stored ledger at '{key}' is not a valid batch array"))?),
            None => Ok(CreditLedger::default()),
        }
    }

    async fn save(&self, user_id: Uuid, ledger: &CreditLedger) -> Result<(), AppError> {
        let value = serde_json::to_value(ledger).context("Failed to serialize ledger")?;
        sqlx::query(
            r#"
            INSERT INTO ledger_entries (key, value, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()
            "#,
        )
        .bind(ledger_key(user_id))
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
