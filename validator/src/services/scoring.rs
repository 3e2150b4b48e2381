//! Per-epoch miner scoring.
//!
//! Every epoch the validator pings miners, challenges them with ground
//! truth lines, and folds the counters into a weight vector for emission.

use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};
use tracing::info;

// Active epoch weighting: agreement with ground truth challenges dominates,
// uptime, proof volume and check volume split the rest.
const ACTIVE_HEALTH_WEIGHT: f64 = 0.15;
const ACTIVE_AGREEMENT_WEIGHT: f64 = 0.55;
const ACTIVE_PROOF_WEIGHT: f64 = 0.15;
const ACTIVE_VOLUME_WEIGHT: f64 = 0.15;

/// The per-epoch counters tracked for a single miner.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MinerMetrics {
    /// The miner's uid on the subnet.
    pub uid: u16,

    /// The miner's hotkey.
    pub hotkey: String,

    /// Health pings sent this epoch.
    pub health_checks: u32,

    /// Health pings answered this epoch.
    pub health_responses: u32,

    /// Candidate lines the miner checked this epoch.
    pub lines_checked: u32,

    /// Proofs the miner submitted this epoch.
    pub proofs_submitted: u32,

    /// Challenge lines issued to the miner this epoch.
    pub challenges_issued: u32,

    /// Challenge lines where the miner agreed with ground truth.
    pub challenges_agreed: u32,

    /// Epochs the miner has responded in without interruption.
    pub consecutive_epochs: u32,
}

impl MinerMetrics {
    fn health_rate(&self) -> f64 {
        if self.health_checks == 0 {
            return 0.0;
        }
        f64::from(self.health_responses) / f64::from(self.health_checks)
    }

    fn agreement_rate(&self) -> f64 {
        if self.challenges_issued == 0 {
            return 0.0;
        }
        f64::from(self.challenges_agreed) / f64::from(self.challenges_issued)
    }

    fn score(&self, is_active: bool, max_lines_checked: u32, max_proofs: u32) -> f64 {
        if !is_active {
            // Inactive epochs fall back to a liveness baseline.
            return self.health_rate();
        }
        let volume = if max_lines_checked == 0 {
            0.0
        } else {
            f64::from(self.lines_checked) / f64::from(max_lines_checked)
        };
        let proofs = if max_proofs == 0 { 0.0 } else { f64::from(self.proofs_submitted) / f64::from(max_proofs) };
        ACTIVE_HEALTH_WEIGHT * self.health_rate()
            + ACTIVE_AGREEMENT_WEIGHT * self.agreement_rate()
            + ACTIVE_PROOF_WEIGHT * proofs
            + ACTIVE_VOLUME_WEIGHT * volume
    }
}

/// Tracks miner counters across an epoch and computes emission weights.
#[derive(Default)]
pub struct MinerScorer {
    miners: Mutex<HashMap<u16, MinerMetrics>>,
}

impl MinerScorer {
    /// Constructs an empty scorer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures a miner is tracked, updating its hotkey if it changed.
    pub fn register(&self, uid: u16, hotkey: &str) {
        let mut miners = self.miners.lock().unwrap_or_else(PoisonError::into_inner);
        let metrics = miners.entry(uid).or_insert_with(|| MinerMetrics { uid, ..Default::default() });
        if metrics.hotkey != hotkey {
            metrics.hotkey = hotkey.to_string();
        }
    }

    /// Records the result of a health ping.
    pub fn record_health_check(&self, uid: u16, responded: bool) {
        let mut miners = self.miners.lock().unwrap_or_else(PoisonError::into_inner);
        let metrics = miners.entry(uid).or_insert_with(|| MinerMetrics { uid, ..Default::default() });
        metrics.health_checks = metrics.health_checks.saturating_add(1);
        if responded {
            metrics.health_responses = metrics.health_responses.saturating_add(1);
        }
    }

    /// Records how many candidate lines a miner checked.
    pub fn record_lines_checked(&self, uid: u16, count: u32) {
        let mut miners = self.miners.lock().unwrap_or_else(PoisonError::into_inner);
        let metrics = miners.entry(uid).or_insert_with(|| MinerMetrics { uid, ..Default::default() });
        metrics.lines_checked = metrics.lines_checked.saturating_add(count);
    }

    /// Records a submitted proof.
    pub fn record_proof_submitted(&self, uid: u16) {
        let mut miners = self.miners.lock().unwrap_or_else(PoisonError::into_inner);
        let metrics = miners.entry(uid).or_insert_with(|| MinerMetrics { uid, ..Default::default() });
        metrics.proofs_submitted = metrics.proofs_submitted.saturating_add(1);
    }

    /// Records a challenge line result for a miner.
    pub fn record_challenge_result(&self, uid: u16, agreed: bool) {
        let mut miners = self.miners.lock().unwrap_or_else(PoisonError::into_inner);
        let metrics = miners.entry(uid).or_insert_with(|| MinerMetrics { uid, ..Default::default() });
        metrics.challenges_issued = metrics.challenges_issued.saturating_add(1);
        if agreed {
            metrics.challenges_agreed = metrics.challenges_agreed.saturating_add(1);
        }
    }

    /// Bumps the consecutive epoch counter for the given miners.
    pub fn bump_consecutive_epochs(&self, uids: &[u16]) {
        let mut miners = self.miners.lock().unwrap_or_else(PoisonError::into_inner);
        for uid in uids {
            if let Some(metrics) = miners.get_mut(uid) {
                metrics.consecutive_epochs = metrics.consecutive_epochs.saturating_add(1);
            }
        }
    }

    /// A snapshot of a miner's counters.
    pub fn get(&self, uid: u16) -> Option<MinerMetrics> {
        self.miners.lock().unwrap_or_else(PoisonError::into_inner).get(&uid).cloned()
    }

    /// The number of tracked miners.
    pub fn tracked_miners(&self) -> usize {
        self.miners.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Computes the emission weight vector for this epoch.
    ///
    /// Weights sum to one over the tracked miners; an empty map is returned
    /// when no miner is tracked. When every score is zero the emission is
    /// split evenly rather than withheld.
    pub fn compute_weights(&self, is_active: bool) -> HashMap<u16, f64> {
        let miners = self.miners.lock().unwrap_or_else(PoisonError::into_inner);
        if miners.is_empty() {
            return HashMap::new();
        }
        let max_lines = miners.values().map(|m| m.lines_checked).max().unwrap_or(0);
        let max_proofs = miners.values().map(|m| m.proofs_submitted).max().unwrap_or(0);

        let scores: HashMap<u16, f64> =
            miners.values().map(|m| (m.uid, m.score(is_active, max_lines, max_proofs))).collect();
        let total: f64 = scores.values().sum();
        if total <= f64::EPSILON {
            let even = 1.0 / miners.len() as f64;
            return miners.keys().map(|uid| (*uid, even)).collect();
        }
        scores.into_iter().map(|(uid, score)| (uid, score / total)).collect()
    }

    /// Clears the per-epoch counters, keeping miner registrations.
    pub fn reset_epoch(&self) {
        let mut miners = self.miners.lock().unwrap_or_else(PoisonError::into_inner);
        for metrics in miners.values_mut() {
            let kept = MinerMetrics {
                uid: metrics.uid,
                hotkey: metrics.hotkey.clone(),
                consecutive_epochs: metrics.consecutive_epochs,
                ..Default::default()
            };
            *metrics = kept;
        }
        info!(miners = miners.len(), "Epoch counters reset");
    }
}
