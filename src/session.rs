//! Per-session conversation memory.
//!
//! Sessions are keyed by an opaque identifier and hold an append-only,
//! ordered list of turns for the lifetime of the process. There is no
//! persistence and no expiry; a session disappears only on explicit clear.

use std::collections::HashMap;
use std::sync::RwLock;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One message in a session's ordered history.
#[derive(Debug, Clone)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

/// In-memory store of conversation histories, shared across sessions.
///
/// All mutation is either an append or a whole-session delete. Concurrent
/// requests against the same session id interleave last-write-wins; distinct
/// sessions never contend beyond the map lock.
#[derive(Default)]
pub struct SessionStore {
    inner: RwLock<HashMap<String, Vec<Turn>>>,
}

impl SessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn to a session, creating the session on first use.
    pub fn append_turn(&self, session_id: &str, role: Role, text: &str) {
        let mut map = self.inner.write().expect("session store lock poisoned");
        map.entry(session_id.to_string()).or_default().push(Turn {
            role,
            text: text.to_string(),
        });
    }

    /// Get the ordered history for a session. Unknown sessions yield an
    /// empty history, not an error.
    pub fn history(&self, session_id: &str) -> Vec<Turn> {
        let map = self.inner.read().expect("session store lock poisoned");
        map.get(session_id).cloned().unwrap_or_default()
    }

    /// Remove a session and its history. Clearing an absent session is a
    /// no-op.
    pub fn clear(&self, session_id: &str) {
        let mut map = self.inner.write().expect("session store lock poisoned");
        map.remove(session_id);
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        let map = self.inner.read().expect("session store lock poisoned");
        map.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_preserves_append_order() {
        let store = SessionStore::new();
        store.append_turn("s1", Role::User, "first");
        store.append_turn("s1", Role::Assistant, "second");
        store.append_turn("s1", Role::User, "third");

        let history = store.history("s1");
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].text, "first");
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[1].text, "second");
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[2].text, "third");
    }

    #[test]
    fn test_unknown_session_is_empty() {
        let store = SessionStore::new();
        assert!(store.history("missing").is_empty());
    }

    #[test]
    fn test_sessions_are_independent() {
        let store = SessionStore::new();
        store.append_turn("a", Role::User, "hello a");
        store.append_turn("b", Role::User, "hello b");

        assert_eq!(store.history("a").len(), 1);
        assert_eq!(store.history("b").len(), 1);
        assert_eq!(store.history("a")[0].text, "hello a");
    }

    #[test]
    fn test_clear_is_idempotent() {
        let store = SessionStore::new();
        store.append_turn("s1", Role::User, "hello");
        assert_eq!(store.session_count(), 1);

        store.clear("s1");
        assert!(store.history("s1").is_empty());
        assert_eq!(store.session_count(), 0);

        // Clearing again (or clearing a session that never existed) is fine
        store.clear("s1");
        store.clear("never-existed");
        assert!(store.history("s1").is_empty());
    }
}
