//! Health tracking.
//!
//! Uptime is part of miner scoring, so responsiveness to validator health
//! pings directly affects emissions.

use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Mutex, PoisonError,
    },
    time::Instant,
};

/// A snapshot of the miner's health.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthStatus {
    /// Our uid on the subnet, when registered.
    pub uid: Option<u16>,

    /// Whether the odds feed answered the last connectivity probe.
    pub odds_api_connected: bool,

    /// Whether the chain neuron is registered.
    pub bt_connected: bool,

    /// Seconds since the miner started.
    pub uptime_seconds: f64,

    /// Health pings answered since start.
    pub ping_count: u64,
}

/// Tracks miner health for validator health checks.
pub struct HealthTracker {
    uid: Mutex<Option<u16>>,
    odds_api_connected: AtomicBool,
    bt_connected: AtomicBool,
    started_at: Instant,
    ping_count: AtomicU64,
}

impl Default for HealthTracker {
    fn default() -> Self {
        Self {
            uid: Mutex::new(None),
            odds_api_connected: AtomicBool::new(false),
            bt_connected: AtomicBool::new(false),
            started_at: Instant::now(),
            ping_count: AtomicU64::new(0),
        }
    }
}

impl HealthTracker {
    /// Constructs a tracker with the clock started now.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a health check ping from a validator.
    pub fn record_ping(&self) {
        self.ping_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Sets our uid once registration is known.
    pub fn set_uid(&self, uid: u16) {
        *self.uid.lock().unwrap_or_else(PoisonError::into_inner) = Some(uid);
    }

    /// Updates odds feed connectivity.
    pub fn set_odds_api_connected(&self, connected: bool) {
        self.odds_api_connected.store(connected, Ordering::Relaxed);
    }

    /// Updates chain connectivity.
    pub fn set_bt_connected(&self, connected: bool) {
        self.bt_connected.store(connected, Ordering::Relaxed);
    }

    /// The current health snapshot.
    pub fn status(&self) -> HealthStatus {
        HealthStatus {
            uid: *self.uid.lock().unwrap_or_else(PoisonError::into_inner),
            odds_api_connected: self.odds_api_connected.load(Ordering::Relaxed),
            bt_connected: self.bt_connected.load(Ordering::Relaxed),
            uptime_seconds: self.started_at.elapsed().as_secs_f64(),
            ping_count: self.ping_count.load(Ordering::Relaxed),
        }
    }
}
