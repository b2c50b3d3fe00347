//! Credit Ledger: per-user prepaid allowances with expiry.
//!
//! Pure data structure: every operation takes `now` explicitly so expiry is evaluated
//! against the caller's clock on each call. Persistence lives in `store`, locking in
//! `service`.
//!
//! Debits are FEFO (first-expiring-first-out) and all-or-nothing.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::credits::CreditBatch;

/// Ordered batches in insertion order. Serializes as a bare JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CreditLedger {
    batches: Vec<CreditBatch>,
}

impl CreditLedger {
    #[cfg(test)]
    pub fn from_batches(batches: Vec<CreditBatch>) -> Self {
        Self { batches }
    }

    pub fn batches(&self) -> &[CreditBatch] {
        &self.batches
    }

    /// Appends a batch expiring `validity_days` after `now`.
    /// `amount` has no upper bound.
    pub fn grant(
        &mut self,
        amount: u32,
        validity_days: u32,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        if amount == 0 {
            return Err(AppError::Validation(
                "amount must be a positive integer".to_string(),
            ));
        }
        if validity_days == 0 {
            return Err(AppError::Validation(
                "validity_days must be a positive integer".to_string(),
            ));
        }
        let expiry_timestamp = now
            .checked_add_signed(Duration::days(i64::from(validity_days)))
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "validity_days {validity_days} puts the expiry out of range"
                ))
            })?;
        self.prune(now);
        self.batches.push(CreditBatch {
            amount,
            expiry_timestamp,
        });
        Ok(())
    }

    /// Sum of all batches still live at `now`.
    pub fn total_available(&self, now: DateTime<Utc>) -> u64 {
        self.batches
            .iter()
            .filter(|b| b.is_live(now))
            .map(|b| u64::from(b.amount))
            .sum()
    }

    /// Removes `count` credits, earliest-expiring batch first.
    ///
    /// Returns `false` without touching any batch when fewer than `count` credits are
    /// live. On success spent and expired batches are pruned; survivors keep their
    /// insertion order.
    pub fn debit(&mut self, count: u32, now: DateTime<Utc>) -> bool {
        if count == 0 {
            return true;
        }
        if self.total_available(now) < u64::from(count) {
            return false;
        }

        let mut order: Vec<usize> = (0..self.batches.len())
            .filter(|&i| self.batches[i].is_live(now))
            .collect();
        // Stable: batches with equal expiry are consumed in insertion order.
        order.sort_by_key(|&i| self.batches[i].expiry_timestamp);

        let mut remaining = count;
        for i in order {
            if remaining == 0 {
                break;
            }
            let batch = &mut self.batches[i];
            let take = remaining.min(batch.amount);
            batch.amount -= take;
            remaining -= take;
        }

        self.prune(now);
        true
    }

    /// Drops spent and expired batches.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        self.batches.retain(|b| b.amount > 0 && b.is_live(now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
    }

    fn batch(amount: u32, days_from_t0: i64) -> CreditBatch {
        CreditBatch {
            amount,
            expiry_timestamp: t0() + Duration::days(days_from_t0),
        }
    }

    #[test]
    fn test_grant_sets_expiry_from_now() {
        let mut ledger = CreditLedger::default();
        ledger.grant(100, 30, t0()).unwrap();
        assert_eq!(ledger.batches(), &[batch(100, 30)]);
        assert_eq!(ledger.total_available(t0()), 100);
    }

    #[test]
    fn test_grant_rejects_zero_amount_and_zero_days() {
        let mut ledger = CreditLedger::default();
        assert!(matches!(
            ledger.grant(0, 30, t0()),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            ledger.grant(10, 0, t0()),
            Err(AppError::Validation(_))
        ));
        assert!(ledger.batches().is_empty());
    }

    #[test]
    fn test_grant_has_no_upper_bound() {
        let mut ledger = CreditLedger::default();
        ledger.grant(u32::MAX, 1, t0()).unwrap();
        ledger.grant(u32::MAX, 1, t0()).unwrap();
        assert_eq!(ledger.total_available(t0()), 2 * u64::from(u32::MAX));
    }

    #[test]
    fn test_total_excludes_expired_batches_at_every_instant() {
        let ledger = CreditLedger::from_batches(vec![batch(5, 10), batch(3, 5), batch(7, -1)]);
        for hours in -48..(24 * 12) {
            let now = t0() + Duration::hours(hours);
            let expected: u64 = ledger
                .batches()
                .iter()
                .filter(|b| b.expiry_timestamp > now)
                .map(|b| u64::from(b.amount))
                .sum();
            assert_eq!(ledger.total_available(now), expected, "at {now}");
        }
    }

    #[test]
    fn test_batch_expiring_exactly_now_is_excluded() {
        let ledger = CreditLedger::from_batches(vec![batch(4, 0)]);
        assert_eq!(ledger.total_available(t0()), 0);
    }

    #[test]
    fn test_grant_with_out_of_range_expiry_is_rejected() {
        let mut ledger = CreditLedger::default();
        ledger.grant(5, 10, t0()).unwrap();
        let before = ledger.clone();

        let err = ledger.grant(1, u32::MAX, t0()).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_debit_is_fefo() {
        let mut ledger = CreditLedger::from_batches(vec![batch(5, 10), batch(3, 5)]);
        assert!(ledger.debit(4, t0()));
        // The 5-day batch is used up before the 10-day batch is touched.
        assert_eq!(ledger.batches(), &[batch(4, 10)]);
    }

    #[test]
    fn test_failed_debit_leaves_ledger_byte_identical() {
        let mut ledger = CreditLedger::from_batches(vec![batch(1, 10), batch(0, 3), batch(9, -2)]);
        let before = serde_json::to_vec(&ledger).unwrap();
        assert!(!ledger.debit(2, t0()));
        assert_eq!(serde_json::to_vec(&ledger).unwrap(), before);
    }

    #[test]
    fn test_debit_skips_expired_batches() {
        let mut ledger = CreditLedger::from_batches(vec![batch(10, -1), batch(2, 3)]);
        assert!(ledger.debit(2, t0()));
        assert!(ledger.batches().is_empty());
    }

    #[test]
    fn test_debit_spans_multiple_batches_and_keeps_insertion_order() {
        let mut ledger =
            CreditLedger::from_batches(vec![batch(4, 30), batch(2, 7), batch(3, 14), batch(1, 60)]);
        assert!(ledger.debit(6, t0()));
        assert_eq!(ledger.batches(), &[batch(3, 30), batch(1, 60)]);
    }

    #[test]
    fn test_equal_expiry_consumed_in_insertion_order() {
        let mut ledger = CreditLedger::from_batches(vec![batch(2, 5), batch(2, 5)]);
        assert!(ledger.debit(1, t0()));
        assert_eq!(ledger.batches(), &[batch(1, 5), batch(2, 5)]);
    }

    #[test]
    fn test_debit_zero_is_noop() {
        let mut ledger = CreditLedger::from_batches(vec![batch(2, 5)]);
        assert!(ledger.debit(0, t0()));
        assert_eq!(ledger.batches(), &[batch(2, 5)]);
    }

    #[test]
    fn test_debit_exact_balance_empties_ledger() {
        let mut ledger = CreditLedger::default();
        ledger.grant(3, 1, t0()).unwrap();
        assert!(ledger.debit(3, t0()));
        assert_eq!(ledger.total_available(t0()), 0);
        assert!(!ledger.debit(1, t0()));
    }

    #[test]
    fn test_serializes_as_bare_array() {
        let ledger = CreditLedger::from_batches(vec![batch(5, 10)]);
        let json = serde_json::to_value(&ledger).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["amount"], 5);
        let recovered: CreditLedger = serde_json::from_value(json).unwrap();
        assert_eq!(recovered, ledger);
    }
}
