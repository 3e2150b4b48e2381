//! Tracking of concurrent set membership sessions.

use crate::{errors::MpcError, set_membership::MembershipSession};
use std::collections::{HashMap, VecDeque};
use tracing::warn;

/// The default bound on concurrently tracked sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 1024;

/// A bounded table of in-flight set membership sessions, keyed by session id.
///
/// The table never grows past its bound: inserting into a full table evicts
/// the oldest session. Expired sessions are swept on every insert.
pub struct SessionTable {
    sessions: HashMap<String, MembershipSession>,
    insertion_order: VecDeque<String>,
    max_sessions: usize,
}

impl Default for SessionTable {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SESSIONS)
    }
}

impl SessionTable {
    /// Constructs a table bounded at the given number of sessions.
    pub fn new(max_sessions: usize) -> Self {
        Self { sessions: HashMap::new(), insertion_order: VecDeque::new(), max_sessions }
    }

    /// Tracks a new session.
    ///
    /// Fails if a session with the same id is already tracked, whether still
    /// collecting or already decided.
    pub fn insert(&mut self, session: MembershipSession) -> Result<(), MpcError> {
        let session_id = session.session_id().to_string();
        if self.sessions.contains_key(&session_id) {
            return Err(MpcError::DuplicateSession(session_id));
        }
        self.evict_expired();
        while self.sessions.len() >= self.max_sessions {
            match self.insertion_order.pop_front() {
                Some(oldest) => {
                    if self.sessions.remove(&oldest).is_some() {
                        warn!(session_id = %oldest, "Evicting oldest session, table is full");
                    }
                }
                None => break,
            }
        }
        self.insertion_order.push_back(session_id.clone());
        self.sessions.insert(session_id, session);
        Ok(())
    }

    /// Looks up a session.
    pub fn get(&self, session_id: &str) -> Option<&MembershipSession> {
        self.sessions.get(session_id)
    }

    /// Looks up a session for mutation.
    pub fn get_mut(&mut self, session_id: &str) -> Option<&mut MembershipSession> {
        self.sessions.get_mut(session_id)
    }

    /// Stops tracking a session.
    pub fn remove(&mut self, session_id: &str) -> Option<MembershipSession> {
        self.insertion_order.retain(|id| id != session_id);
        self.sessions.remove(session_id)
    }

    /// The number of tracked sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn evict_expired(&mut self) {
        let sessions = &mut self.sessions;
        self.insertion_order.retain(|id| {
            let expired = sessions.get(id).map(MembershipSession::is_expired).unwrap_or(true);
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
    use crate::set_membership::DEFAULT_SESSION_TIMEOUT;
    use std::{collections::BTreeSet, time::Duration};

    fn make_session(session_id: &str, timeout: Duration) -> MembershipSession {
        MembershipSession::new(session_id.into(), 0, BTreeSet::from([1, 2]), vec![1, 2, 3, 4, 5, 6, 7], 7, timeout)
            .unwrap()
    }

    #[test]
    fn insert_and_get() {
        let mut table = SessionTable::default();
        table.insert(make_session("s-1", DEFAULT_SESSION_TIMEOUT)).unwrap();
        assert!(table.get("s-1").is_some());
        assert!(table.get("s-2").is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn duplicate_session_rejected() {
        let mut table = SessionTable::default();
        table.insert(make_session("s-1", DEFAULT_SESSION_TIMEOUT)).unwrap();
        let err = table.insert(make_session("s-1", DEFAULT_SESSION_TIMEOUT)).unwrap_err();
        assert_eq!(err, MpcError::DuplicateSession("s-1".to_string()));
    }

    #[test]
    fn oldest_session_evicted_at_capacity() {
        let mut table = SessionTable::new(3);
        for id in ["s-1", "s-2", "s-3"] {
            table.insert(make_session(id, DEFAULT_SESSION_TIMEOUT)).unwrap();
        }
        table.insert(make_session("s-4", DEFAULT_SESSION_TIMEOUT)).unwrap();
        assert_eq!(table.len(), 3);
        assert!(table.get("s-1").is_none());
        assert!(table.get("s-4").is_some());
    }

    #[test]
    fn expired_sessions_swept_on_insert() {
        let mut table = SessionTable::new(3);
        table.insert(make_session("s-1", Duration::ZERO)).unwrap();
        table.insert(make_session("s-2", DEFAULT_SESSION_TIMEOUT)).unwrap();
        assert!(table.get("s-1").is_none());
        assert!(table.get("s-2").is_some());
    }

    #[test]
    fn remove_is_safe_on_unknown_ids() {
        let mut table = SessionTable::default();
        assert!(table.remove("never-seen").is_none());
        table.insert(make_session("s-1", DEFAULT_SESSION_TIMEOUT)).unwrap();
        assert!(table.remove("s-1").is_some());
        assert!(table.is_empty());
    }

    #[test]
    fn zero_capacity_table_holds_nothing_older() {
        let mut table = SessionTable::new(1);
        table.insert(make_session("s-1", DEFAULT_SESSION_TIMEOUT)).unwrap();
        table.insert(make_session("s-2", DEFAULT_SESSION_TIMEOUT)).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.get("s-2").is_some());
    }
}
