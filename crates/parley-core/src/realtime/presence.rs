//! Presence registry: user id to active transport sessions.
//!
//! Process-local and in-memory, mutated only from the gateway's connection
//! handlers. The trait seam exists so a multi-instance deployment can swap in
//! a shared external store without touching the gateway.
//!
//! State machine per user: Offline -> Online on the first session's presence
//! signal -> Offline once the last session disconnects.

use std::collections::HashSet;

use dashmap::DashMap;

use parley_types::presence::SessionId;
use parley_types::user::UserId;

/// Presence port for the gateway.
pub trait PresenceStore: Send + Sync {
    /// Register a session for a user. Returns true when this was the user's
    /// first active session (Offline -> Online transition).
    fn connect(&self, user_id: UserId, session_id: SessionId) -> bool;

    /// Remove a session mapping. Returns true when no session remains for the
    /// user (Online -> Offline transition). Unknown sessions are a no-op.
    fn disconnect(&self, user_id: &UserId, session_id: &SessionId) -> bool;

    /// Whether the user has at least one active session.
    fn is_online(&self, user_id: &UserId) -> bool;

    /// All currently online users.
    fn online_users(&self) -> Vec<UserId>;
}

/// In-memory presence map for single-instance deployments.
#[derive(Debug, Default)]
pub struct InMemoryPresence {
    sessions: DashMap<UserId, HashSet<SessionId>>,
}

impl InMemoryPresence {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PresenceStore for InMemoryPresence {
    fn connect(&self, user_id: UserId, session_id: SessionId) -> bool {
        let mut entry = self.sessions.entry(user_id).or_default();
        let went_online = entry.is_empty();
        entry.insert(session_id);
        went_online
    }

    fn disconnect(&self, user_id: &UserId, session_id: &SessionId) -> bool {
        let went_offline = match self.sessions.get_mut(user_id) {
            Some(mut entry) => entry.remove(session_id) && entry.is_empty(),
            None => false,
        };
        if went_offline {
            // Guard re-checks emptiness: a session may have connected between
            // releasing the entry lock and this removal.
            self.sessions.remove_if(user_id, |_, set| set.is_empty());
        }
        went_offline
    }

    fn is_online(&self, user_id: &UserId) -> bool {
        self.sessions
            .get(user_id)
            .is_some_and(|entry| !entry.is_empty())
    }

    fn online_users(&self) -> Vec<UserId> {
        self.sessions
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .map(|entry| *entry.key())
            .collect()
    }
}
