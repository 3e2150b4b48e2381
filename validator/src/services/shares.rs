//! Key share storage.
//!
//! Each signal's encryption key is split into ten Shamir shares distributed
//! across validators. This service manages this validator's local pair of
//! index share and encrypted key share per signal. In production the store
//! would be backed by encrypted persistent storage.

use shamir_sharing::Share;
use std::{
    collections::{BTreeSet, HashMap},
    sync::{Mutex, PoisonError},
    time::Instant,
};
use tracing::{info, warn};

/// A validator's share pair for a single signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalShareRecord {
    /// The signal this record belongs to.
    pub signal_id: String,

    /// The issuer of the signal.
    pub genius_address: String,

    /// This validator's share of the signal's real index.
    pub share: Share,

    /// This validator's share of the key, encrypted to this validator.
    ///
    /// The store never inspects the ciphertext; it only hands out byte
    /// identical copies.
    pub encrypted_key_share: Vec<u8>,

    /// When the record was inserted, on the monotonic clock.
    pub stored_at: Instant,

    /// The buyers this record's key share has been disclosed to.
    pub released_to: BTreeSet<String>,
}

/// The result of a store operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// The record was inserted.
    Stored,

    /// A record with this signal id already exists; nothing was changed.
    DuplicateIgnored,
}

/// In-memory store for the signal key shares held by this validator.
///
/// Operations are atomic with respect to concurrent callers and never
/// suspend. Within a signal id, operations are serializable; across signals
/// they are independent.
#[derive(Default)]
pub struct ShareStore {
    records: Mutex<HashMap<String, SignalShareRecord>>,
}

impl ShareStore {
    /// Constructs an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a new key share for a signal.
    ///
    /// A second store with the same signal id is a no-op.
    pub fn store(
        &self,
        signal_id: &str,
        genius_address: &str,
        share: Share,
        encrypted_key_share: Vec<u8>,
    ) -> StoreOutcome {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        if records.contains_key(signal_id) {
            warn!(signal_id, "Share already stored, ignoring");
            return StoreOutcome::DuplicateIgnored;
        }
        records.insert(
            signal_id.to_string(),
            SignalShareRecord {
                signal_id: signal_id.to_string(),
                genius_address: genius_address.to_string(),
                share,
                encrypted_key_share,
                stored_at: Instant::now(),
                released_to: BTreeSet::new(),
            },
        );
        info!(signal_id, genius = genius_address, "Share stored");
        StoreOutcome::Stored
    }

    /// Retrieves a copy of a share record by signal id.
    pub fn get(&self, signal_id: &str) -> Option<SignalShareRecord> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).get(signal_id).cloned()
    }

    /// Checks whether we hold a share for this signal.
    pub fn has(&self, signal_id: &str) -> bool {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).contains_key(signal_id)
    }

    /// Releases the encrypted key share to a buyer.
    ///
    /// Idempotent per buyer: repeat calls return the byte identical
    /// ciphertext and record the buyer exactly once. Returns `None` and
    /// mutates nothing for unknown signals.
    pub fn release(&self, signal_id: &str, buyer_address: &str) -> Option<Vec<u8>> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let record = match records.get_mut(signal_id) {
            Some(record) => record,
            None => {
                warn!(signal_id, "Share not found for release");
                return None;
            }
        };
        if record.released_to.contains(buyer_address) {
            info!(signal_id, buyer = buyer_address, "Share already released");
        } else {
            record.released_to.insert(buyer_address.to_string());
            info!(signal_id, buyer = buyer_address, "Share released");
        }
        Some(record.encrypted_key_share.clone())
    }

    /// Removes a share, e.g. when a signal is voided or expired.
    ///
    /// Removing an unknown signal is not an error.
    pub fn remove(&self, signal_id: &str) {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).remove(signal_id);
    }

    /// The number of signals we hold shares for.
    pub fn count(&self) -> usize {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// All signal ids we hold shares for.
    pub fn active_signals(&self) -> Vec<String> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).keys().cloned().collect()
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use math_lib::FieldElement;

    fn make_share() -> Share {
        Share { x: 1, y: FieldElement::from_u64(12345) }
    }

    #[test]
    fn store_and_get() {
        let store = ShareStore::new();
        let outcome = store.store("sig", "0xG", make_share(), b"deadbeef".to_vec());
        assert_eq!(outcome, StoreOutcome::Stored);
        assert!(store.has("sig"));

        let record = store.get("sig").unwrap();
        assert_eq!(record.signal_id, "sig");
        assert_eq!(record.genius_address, "0xG");
        assert_eq!(record.share, make_share());
        assert_eq!(record.encrypted_key_share, b"deadbeef");
        assert!(record.released_to.is_empty());
    }

    #[test]
    fn duplicate_store_leaves_state_unchanged() {
        let store = ShareStore::new();
        store.store("sig", "0xG", make_share(), b"original".to_vec());
        let before = store.get("sig").unwrap();

        let outcome = store.store("sig", "0xOther", Share { x: 2, y: FieldElement::ZERO }, b"other".to_vec());
        assert_eq!(outcome, StoreOutcome::DuplicateIgnored);
        assert_eq!(store.get("sig").unwrap(), before);
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn release_is_idempotent_per_buyer() {
        let store = ShareStore::new();
        store.store("sig", "0xG", make_share(), b"deadbeef".to_vec());

        let first = store.release("sig", "0xBuyer").unwrap();
        assert_eq!(first, b"deadbeef");
        let second = store.release("sig", "0xBuyer").unwrap();
        assert_eq!(second, first);

        let record = store.get("sig").unwrap();
        assert_eq!(record.released_to, BTreeSet::from(["0xBuyer".to_string()]));
    }

    #[test]
    fn release_tracks_multiple_buyers() {
        let store = ShareStore::new();
        store.store("sig", "0xG", make_share(), b"ct".to_vec());
        store.release("sig", "0xA").unwrap();
        store.release("sig", "0xB").unwrap();
        let record = store.get("sig").unwrap();
        assert_eq!(record.released_to.len(), 2);
    }

    #[test]
    fn release_of_unknown_signal_is_none() {
        let store = ShareStore::new();
        assert_eq!(store.release("missing", "0xBuyer"), None);
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn remove_deletes_and_tolerates_unknown() {
        let store = ShareStore::new();
        store.store("sig", "0xG", make_share(), b"ct".to_vec());
        store.remove("sig");
        assert!(!store.has("sig"));
        store.remove("sig");
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn active_signals_lists_all() {
        let store = ShareStore::new();
        store.store("sig-1", "0xG", make_share(), b"a".to_vec());
        store.store("sig-2", "0xG", make_share(), b"b".to_vec());
        let mut signals = store.active_signals();
        signals.sort();
        assert_eq!(signals, vec!["sig-1".to_string(), "sig-2".to_string()]);
    }
}
