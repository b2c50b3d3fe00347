use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One prepaid allowance. Spent (amount 0) or expired batches are pruned by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditBatch {
    pub amount: u32,
    pub expiry_timestamp: DateTime<Utc>,
}

impl CreditBatch {
    /// A batch is live strictly before its expiry instant.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expiry_timestamp > now
    }
}

/// A purchasable bundle of credits. `price` is shown to buyers only; this service
/// takes no payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CreditPackage {
    pub id: &'static str,
    pub credits: u32,
    pub price: u32,
    pub currency: &'static str,
    pub validity_days: u32,
}
