//! Credit Service: load, mutate and persist a user's ledger as one critical section.
//!
//! Within this process every read-modify-write on a user's ledger runs under that
//! user's async mutex. Concurrent writers in other processes are last-write-wins.
//! A user's mutex is dropped from the registry once nobody holds or waits on it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};
use uuid::Uuid;

use crate::credits::clock::Clock;
use crate::credits::ledger::CreditLedger;
use crate::credits::store::LedgerStore;
use crate::errors::AppError;
use crate::models::credits::CreditBatch;

/// Credits charged for one non-chat AI operation.
pub const AI_OPERATION_COST: u32 = 1;

#[derive(Debug, Clone, Serialize)]
pub struct LedgerSnapshot {
    pub user_id: Uuid,
    pub total_available: u64,
    pub batches: Vec<CreditBatch>,
}

pub struct CreditService {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

/// Held for the duration of one critical section on a user's ledger.
struct UserLock<'a> {
    locks: &'a DashMap<Uuid, Arc<Mutex<()>>>,
    user_id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for UserLock<'_> {
    fn drop(&mut self) {
        self.guard.take();
        // Only the registry's own reference left: no holder, no waiter.
        self.locks
            .remove_if(&self.user_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl CreditService {
    pub fn new(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            locks: DashMap::new(),
        }
    }

    async fn lock_user(&self, user_id: Uuid) -> UserLock<'_> {
        // Clone out of the map before awaiting so no shard lock is held across the await.
        let lock = self.locks.entry(user_id).or_default().clone();
        UserLock {
            locks: &self.locks,
            user_id,
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Current balance, recomputed against the clock on every call.
    pub async fn balance(&self, user_id: Uuid) -> Result<LedgerSnapshot, AppError> {
        let ledger = self.store.load(user_id).await?;
        let now = self.clock.now();
        Ok(LedgerSnapshot {
            user_id,
            total_available: ledger.total_available(now),
            batches: ledger
                .batches()
                .iter()
                .filter(|b| b.is_live(now))
                .copied()
                .collect(),
        })
    }

    /// Appends a batch and persists it before returning.
    pub async fn grant(
        &self,
        user_id: Uuid,
        amount: u32,
        validity_days: u32,
    ) -> Result<LedgerSnapshot, AppError> {
        let _lock = self.lock_user(user_id).await;

        let mut ledger = self.store.load(user_id).await?;
        let now = self.clock.now();
        ledger.grant(amount, validity_days, now)?;
        self.store.save(user_id, &ledger).await?;

        info!("Granted {amount} credits valid {validity_days}d to user {user_id}");
        Ok(snapshot(user_id, &ledger, now))
    }

    /// Removes `count` credits atomically, earliest-expiring first. When the balance is
    /// too low nothing is written and `InsufficientCredits` is returned.
    pub async fn charge(&self, user_id: Uuid, count: u32) -> Result<(), AppError> {
        let _lock = self.lock_user(user_id).await;

        let mut ledger = self.store.load(user_id).await?;
        let now = self.clock.now();
        if !ledger.debit(count, now) {
            let available = ledger.total_available(now);
            warn!("User {user_id} needs {count} credits, has {available}");
            return Err(AppError::InsufficientCredits {
                required: count,
                available,
            });
        }
        self.store.save(user_id, &ledger).await?;
        info!("Charged {count} credits to user {user_id}");
        Ok(())
    }
}

fn snapshot(user_id: Uuid, ledger: &CreditLedger, now: DateTime<Utc>) -> LedgerSnapshot {
    LedgerSnapshot {
        user_id,
        total_available: ledger.total_available(now),
        batches: ledger.batches().to_vec(),
    }
}
