use std::str::FromStr;

use anyhow::{bail, Context, Result};

/// Where credit ledgers are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerBackend {
    Memory,
    Redis,
    Postgres,
}

impl FromStr for LedgerBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(LedgerBackend::Memory),
            "redis" => Ok(LedgerBackend::Redis),
            "postgres" | "postgresql" => Ok(LedgerBackend::Postgres),
            other => bail!("LEDGER_BACKEND must be one of memory, redis, postgres (got '{other}')"),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Startup fails if the selected ledger backend is missing its connection URL.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub ledger_backend: LedgerBackend,
    pub redis_url: Option<String>,
    pub database_url: Option<String>,
    pub gemini_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub hf_api_key: Option<String>,
    pub provider_timeout_secs: u64,
    /// Chat sessions untouched for this long are dropped.
    pub chat_idle_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let ledger_backend: LedgerBackend = std::env::var("LEDGER_BACKEND")
            .unwrap_or_else(|_| "memory".to_string())
            .parse()?;

        let (redis_url, database_url) = match ledger_backend {
            LedgerBackend::Memory => (optional_env("REDIS_URL"), optional_env("DATABASE_URL")),
            LedgerBackend::Redis => (Some(require_env("REDIS_URL")?), optional_env("DATABASE_URL")),
            LedgerBackend::Postgres => {
                (optional_env("REDIS_URL"), Some(require_env("DATABASE_URL")?))
            }
        };

        Ok(Config {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            ledger_backend,
            redis_url,
            database_url,
            gemini_api_key: optional_env("GEMINI_API_KEY"),
            openai_api_key: optional_env("OPENAI_API_KEY"),
            hf_api_key: optional_env("HF_API_KEY"),
            provider_timeout_secs: std::env::var("PROVIDER_TIMEOUT_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse::<u64>()
                .context("PROVIDER_TIMEOUT_SECS must be a whole number of seconds")?,
            chat_idle_timeout_secs: std::env::var("CHAT_IDLE_TIMEOUT_SECS")
                .unwrap_or_else(|_| "1800".to_string())
                .parse::<u64>()
                .context("CHAT_IDLE_TIMEOUT_SECS must be a whole number of seconds")?,
        })
    }

    /// In-memory ledger, no provider keys.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Config {
            port: 0,
            rust_log: "debug".to_string(),
            ledger_backend: LedgerBackend::Memory,
            redis_url: None,
            database_url: None,
            gemini_api_key: None,
            openai_api_key: None,
            hf_api_key: None,
            provider_timeout_secs: 5,
            chat_idle_timeout_secs: 1800,
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    optional_env(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Blank values count as unset.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
