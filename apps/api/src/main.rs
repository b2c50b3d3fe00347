mod chat;
mod config;
mod credits;
mod db;
mod errors;
mod extraction;
mod llm_client;
mod models;
mod orchestrator;
mod providers;
mod resume;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, LedgerBackend};
use crate::credits::clock::SystemClock;
use crate::credits::service::CreditService;
use crate::credits::store::{LedgerStore, MemoryLedgerStore, PgLedgerStore, RedisLedgerStore};
use crate::db::create_pool;
use crate::orchestrator::Orchestrator;
use crate::providers::build_adapters;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on a malformed or incomplete environment)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resumecraft API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the ledger store
    let store = build_ledger_store(&config).await?;
    let credits = Arc::new(CreditService::new(store, Arc::new(SystemClock)));

    // Initialize provider adapters
    let adapters = build_adapters(&config);
    for adapter in &adapters {
        info!(
            "Provider {} {}",
            adapter.kind(),
            if adapter.is_available() { "ready" } else { "not configured" }
        );
    }
    let orchestrator = Arc::new(Orchestrator::new(adapters));

    // Build app state
    let state = AppState::new(orchestrator, credits, config.clone());
    state.chats.spawn_idle_sweeper();

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn build_ledger_store(config: &Config) -> Result<Arc<dyn LedgerStore>> {
    match config.ledger_backend {
        LedgerBackend::Memory => {
            info!("Ledger store: in-memory (balances are lost on restart)");
            Ok(Arc::new(MemoryLedgerStore::new()))
        }
        LedgerBackend::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .context("REDIS_URL is required for the redis ledger backend")?;
            let client = redis::Client::open(url)?;
            info!("Ledger store: Redis");
            Ok(Arc::new(RedisLedgerStore::new(client)))
        }
        LedgerBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for the postgres ledger backend")?;
            let store = PgLedgerStore::new(create_pool(url).await?);
            store.ensure_schema().await?;
            info!("Ledger store: PostgreSQL");
            Ok(Arc::new(store))
        }
    }
}
