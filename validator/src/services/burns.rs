//! Consumed burn tracking.
//!
//! Buyers pay by burning alpha; each burn transaction may only ever be
//! consumed once, no matter how many times the same receipt is presented.

use chrono::{DateTime, Utc};
use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};
use tracing::{info, warn};

/// A consumed burn.
#[derive(Debug, Clone, PartialEq)]
pub struct BurnRecord {
    /// The coldkey that burned.
    pub coldkey: String,

    /// The burned amount, in alpha.
    pub amount: f64,

    /// When the burn was consumed.
    pub recorded_at: DateTime<Utc>,
}

/// At-most-once ledger of consumed burn transactions.
#[derive(Default)]
pub struct BurnLedger {
    burns: Mutex<HashMap<String, BurnRecord>>,
}

impl BurnLedger {
    /// Constructs an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes a burn transaction.
    ///
    /// Returns `false` if the transaction was already consumed; the ledger
    /// is left untouched in that case.
    pub fn record_burn(&self, tx_hash: &str, coldkey: &str, amount: f64) -> bool {
        let mut burns = self.burns.lock().unwrap_or_else(PoisonError::into_inner);
        if burns.contains_key(tx_hash) {
            warn!(tx_hash, "Burn already consumed");
            return false;
        }
        burns.insert(
            tx_hash.to_string(),
            BurnRecord { coldkey: coldkey.to_string(), amount, recorded_at: Utc::now() },
        );
        info!(tx_hash, coldkey, amount, "Burn consumed");
        true
    }

    /// Whether a burn transaction has been consumed.
    pub fn is_consumed(&self, tx_hash: &str) -> bool {
        self.burns.lock().unwrap_or_else(PoisonError::into_inner).contains_key(tx_hash)
    }

    /// The number of consumed burns.
    pub fn count(&self) -> usize {
        self.burns.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_and_check() {
        let ledger = BurnLedger::new();
        assert!(ledger.record_burn("0xabc123", "5ColdKey", 0.0001));
        assert!(ledger.is_consumed("0xabc123"));
    }

    #[test]
    fn double_consume_rejected() {
        let ledger = BurnLedger::new();
        assert!(ledger.record_burn("0xdouble", "5ColdKey", 0.0001));
        assert!(!ledger.record_burn("0xdouble", "5ColdKey", 0.0001));
        assert_eq!(ledger.count(), 1);
    }

    #[test]
    fn unconsumed_hash_reports_false() {
        let ledger = BurnLedger::new();
        assert!(!ledger.is_consumed("0xnever_seen"));
    }

    #[test]
    fn distinct_burns_tracked_independently() {
        let ledger = BurnLedger::new();
        assert!(ledger.record_burn("0xtx1", "5Key1", 0.0001));
        assert!(ledger.record_burn("0xtx2", "5Key2", 0.0002));
        assert!(ledger.is_consumed("0xtx1"));
        assert!(ledger.is_consumed("0xtx2"));
        assert!(!ledger.is_consumed("0xtx3"));
    }
}
