//! Per-conversation session store
//!
//! Sessions live in a sharded `DashMap`; each one sits behind its own async
//! mutex so a request can hold it across remote calls without blocking other
//! conversations. Nothing is persisted.

use std::collections::VecDeque;
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::metrics;

/// One prior exchange fed back to the translator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DialogueTurn {
    pub utterance: String,
    pub statement: String,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub current_database: String,
    context: VecDeque<DialogueTurn>,
    context_cap: usize,
}

impl Session {
    fn new(id: &str, default_database: &str, context_cap: usize) -> Self {
        Self {
            id: id.to_string(),
            current_database: default_database.to_string(),
            context: VecDeque::with_capacity(context_cap.min(64)),
            context_cap,
        }
    }

    /// Prior turns, oldest first
    pub fn context(&self) -> Vec<DialogueTurn> {
        self.context.iter().cloned().collect()
    }

    pub fn context_len(&self) -> usize {
        self.context.len()
    }

    pub fn set_database(&mut self, database: impl Into<String>) {
        self.current_database = database.into();
    }

    /// Append a turn, evicting the oldest beyond the cap
    pub fn append_context(&mut self, turn: DialogueTurn) {
        if self.context_cap == 0 {
            return;
        }
        while self.context.len() >= self.context_cap {
            self.context.pop_front();
        }
        self.context.push_back(turn);
    }

    /// Drop the dialogue context; the selected database stays
    pub fn clear(&mut self) {
        self.context.clear();
    }
}

pub type SessionHandle = Arc<Mutex<Session>>;

pub struct SessionStore {
    sessions: DashMap<String, SessionHandle>,
    default_database: String,
    context_cap: usize,
}

impl SessionStore {
    pub fn new(default_database: impl Into<String>, context_cap: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            default_database: default_database.into(),
            context_cap,
        }
    }

    pub fn default_database(&self) -> &str {
        &self.default_database
    }

    /// Handle for `session_id`, created with defaults on first use
    pub fn handle(&self, session_id: &str) -> SessionHandle {
        if let Some(existing) = self.sessions.get(session_id) {
            return existing.value().clone();
        }

        let handle = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                debug!(session_id, "Creating session");
                Arc::new(Mutex::new(Session::new(
                    session_id,
                    &self.default_database,
                    self.context_cap,
                )))
            })
            .value()
            .clone();
        metrics::set_active_sessions(self.sessions.len());
        handle
    }

    /// Snapshot of the session, creating it if absent
    pub async fn get(&self, session_id: &str) -> Session {
        self.handle(session_id).lock().await.clone()
    }

    pub async fn set_database(&self, session_id: &str, database: &str) {
        self.handle(session_id).lock().await.set_database(database);
    }

    pub async fn append_context(&self, session_id: &str, turn: DialogueTurn) {
        self.handle(session_id).lock().await.append_context(turn);
    }

    pub async fn clear(&self, session_id: &str) {
        self.handle(session_id).lock().await.clear();
    }

    /// Forget the session entirely
    pub fn remove(&self, session_id: &str) -> bool {
        let removed = self.sessions.remove(session_id).is_some();
        metrics::set_active_sessions(self.sessions.len());
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(i: usize) -> DialogueTurn {
        DialogueTurn {
            utterance: format!("question {}", i),
            statement: format!("SELECT {}", i),
        }
    }

    #[tokio::test]
    async fn test_session_created_with_defaults() {
        let store = SessionStore::new("master", 20);
        let session = store.get("s1").await;
        assert_eq!(session.id, "s1");
        assert_eq!(session.current_database, "master");
        assert_eq!(session.context_len(), 0);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_context_never_exceeds_cap() {
        let store = SessionStore::new("master", 3);
        for i in 0..10 {
            store.append_context("s1", turn(i)).await;
            assert!(store.get("s1").await.context_len() <= 3);
        }
        let context = store.get("s1").await.context();
        assert_eq!(context, vec![turn(7), turn(8), turn(9)]);
    }

    #[tokio::test]
    async fn test_clear_preserves_database() {
        let store = SessionStore::new("master", 20);
        store.set_database("s1", "sales").await;
        store.append_context("s1", turn(1)).await;
        store.clear("s1").await;
        let session = store.get("s1").await;
        assert_eq!(session.current_database, "sales");
        assert_eq!(session.context_len(), 0);
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let store = SessionStore::new("master", 20);
        store.set_database("a", "sales").await;
        assert_eq!(store.get("b").await.current_database, "master");
        assert!(store.remove("a"));
        assert_eq!(store.get("a").await.current_database, "master");
    }

    #[test]
    fn test_zero_cap_keeps_nothing() {
        let mut session = Session::new("s", "master", 0);
        session.append_context(turn(1));
        assert_eq!(session.context_len(), 0);
    }
}
