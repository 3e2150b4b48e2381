//! Session proof generation.
//!
//! In production this module produces a TLSNotary proof of the TLS session
//! used while checking lines, binding the answer to the sportsbook's server
//! certificate. The generator here is a stub that returns a deterministic
//! digest following the same interface, so the surrounding plumbing can be
//! exercised end to end.

use sha2::{Digest, Sha256};
use std::{
    collections::{HashMap, VecDeque},
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};
use tracing::info;

/// Default bound on concurrently retained capture sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 1024;

/// How long a capture session is retained before expiring.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(3600);

/// A generated session proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proof {
    /// The query the proof covers.
    pub query_id: String,

    /// The proof digest.
    pub proof_hash: String,

    /// `submitted`, `verified` or `failed`.
    pub status: &'static str,

    /// Human readable detail.
    pub message: String,
}

/// Stub TLSNotary proof generator.
pub struct ProofGenerator {
    generated_count: AtomicU64,
}

impl Default for ProofGenerator {
    fn default() -> Self {
        Self { generated_count: AtomicU64::new(0) }
    }
}

impl ProofGenerator {
    /// Constructs a generator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Generates a mock proof for the given query.
    ///
    /// The real implementation replays the captured TLS session and produces
    /// a TLSNotary proof for validator verification; here the digest only
    /// commits to the inputs and the current time.
    pub fn generate(&self, query_id: &str, session_data: &str) -> Proof {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(query_id.as_bytes());
        hasher.update(b":");
        hasher.update(session_data.as_bytes());
        hasher.update(b":");
        hasher.update(now.as_nanos().to_be_bytes());
        let proof_hash = hex::encode(hasher.finalize());

        let total = self.generated_count.fetch_add(1, Ordering::Relaxed).saturating_add(1);
        info!(query_id, proof = %proof_hash.chars().take(16).collect::<String>(), total, "Mock proof generated");

        Proof {
            query_id: query_id.to_string(),
            proof_hash,
            status: "submitted",
            message: "stub: mock session proof generated".to_string(),
        }
    }

    /// How many proofs this generator produced.
    pub fn generated_count(&self) -> u64 {
        self.generated_count.load(Ordering::Relaxed)
    }
}

/// A captured line-check session awaiting proof generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedSession {
    /// The query this session served.
    pub query_id: String,

    /// The upstream request the session covered.
    pub request_url: String,

    /// When the session was captured, on the monotonic clock.
    pub captured_at: Instant,
}

/// Bounded store of captured sessions.
///
/// Retention is limited both by count and by age: the oldest session is
/// evicted when the store is full, and expired sessions are purged whenever
/// a new one is recorded.
pub struct SessionCapture {
    sessions: HashMap<String, CapturedSession>,
    insertion_order: VecDeque<String>,
    max_sessions: usize,
    session_ttl: Duration,
}

impl Default for SessionCapture {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_TTL)
    }
}

impl SessionCapture {
    /// Constructs a store with the given bounds.
    pub fn new(max_sessions: usize, session_ttl: Duration) -> Self {
        Self { sessions: HashMap::new(), insertion_order: VecDeque::new(), max_sessions, session_ttl }
    }

    /// Records a session, replacing any existing capture for the query.
    pub fn record(&mut self, session: CapturedSession) {
        self.purge_expired();
        let query_id = session.query_id.clone();
        if self.sessions.remove(&query_id).is_some() {
            self.insertion_order.retain(|id| id != &query_id);
        }
        while self.sessions.len() >= self.max_sessions {
            match self.insertion_order.pop_front() {
                Some(oldest) => {
                    self.sessions.remove(&oldest);
                }
                None => break,
            }
        }
        self.insertion_order.push_back(query_id.clone());
        self.sessions.insert(query_id, session);
    }

    /// Looks up a captured session.
    pub fn get(&self, query_id: &str) -> Option<&CapturedSession> {
        self.sessions.get(query_id)
    }

    /// Drops a captured session; unknown ids are fine.
    pub fn remove(&mut self, query_id: &str) {
        if self.sessions.remove(query_id).is_some() {
            self.insertion_order.retain(|id| id != query_id);
        }
    }

    /// The number of retained sessions.
    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    fn purge_expired(&mut self) {
        let ttl = self.session_ttl;
        let now = Instant::now();
        let sessions = &mut self.sessions;
        self.insertion_order.retain(|id| {
            let expired = sessions
                .get(id)
                .map(|session| now.saturating_duration_since(session.captured_at) >= ttl)
                .unwrap_or(true);
            if expired {
                sessions.remove(id);
            }
            !expired
        });
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn make_session(query_id: &str) -> CapturedSession {
        CapturedSession {
            query_id: query_id.to_string(),
            request_url: "https://api.example.com/v4/sports/nba/odds".to_string(),
            captured_at: Instant::now(),
        }
    }

    #[test]
    fn record_and_get() {
        let mut capture = SessionCapture::default();
        capture.record(make_session("q-1"));
        assert_eq!(capture.get("q-1").unwrap().query_id, "q-1");
    }

    #[test]
    fn get_nonexistent() {
        let capture = SessionCapture::default();
        assert!(capture.get("does-not-exist").is_none());
    }

    #[test]
    fn remove_drops_the_session() {
        let mut capture = SessionCapture::default();
        capture.record(make_session("q-1"));
        capture.remove("q-1");
        assert!(capture.get("q-1").is_none());
        assert_eq!(capture.count(), 0);
    }

    #[test]
    fn remove_nonexistent_is_safe() {
        let mut capture = SessionCapture::default();
        capture.remove("q-nonexistent");
    }

    #[test]
    fn count_tracks_recorded_sessions() {
        let mut capture = SessionCapture::default();
        assert_eq!(capture.count(), 0);
        capture.record(make_session("q-1"));
        assert_eq!(capture.count(), 1);
        capture.record(make_session("q-2"));
        assert_eq!(capture.count(), 2);
    }

    #[test]
    fn oldest_session_evicted_at_capacity() {
        let mut capture = SessionCapture::new(3, DEFAULT_SESSION_TTL);
        for id in ["q-1", "q-2", "q-3"] {
            capture.record(make_session(id));
        }
        assert_eq!(capture.count(), 3);
        capture.record(make_session("q-4"));
        assert_eq!(capture.count(), 3);
        assert!(capture.get("q-1").is_none());
        assert!(capture.get("q-4").is_some());
    }

    #[test]
    fn expired_sessions_purged_on_record() {
        let mut capture = SessionCapture::new(10, Duration::ZERO);
        capture.record(make_session("q-1"));
        capture.record(make_session("q-2"));
        assert!(capture.get("q-1").is_none());
        assert!(capture.get("q-2").is_some());
    }

    #[test]
    fn recording_same_query_overwrites() {
        let mut capture = SessionCapture::default();
        capture.record(make_session("q-1"));
        let replacement = CapturedSession { request_url: "https://other".to_string(), ..make_session("q-1") };
        capture.record(replacement.clone());
        assert_eq!(capture.count(), 1);
        assert_eq!(capture.get("q-1").unwrap().request_url, "https://other");
    }

    #[test]
    fn zero_capacity_still_accepts_latest() {
        let mut capture = SessionCapture::new(0, DEFAULT_SESSION_TTL);
        capture.record(make_session("q-1"));
        assert_eq!(capture.count(), 1);
    }

    #[test]
    fn proofs_are_distinct_per_query() {
        let generator = ProofGenerator::new();
        let first = generator.generate("q-1", "session-data");
        let second = generator.generate("q-2", "session-data");
        assert_ne!(first.proof_hash, second.proof_hash);
        assert_eq!(first.status, "submitted");
        assert_eq!(generator.generated_count(), 2);
    }

    #[test]
    fn proof_hash_is_hex_sha256() {
        let generator = ProofGenerator::new();
        let proof = generator.generate("q-1", "data");
        assert_eq!(proof.proof_hash.len(), 64);
        assert!(proof.proof_hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
