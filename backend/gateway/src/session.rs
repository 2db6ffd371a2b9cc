//! Viewer session identities and the live session table.
//!
//! Each connection task owns its session state (cursor, lag strikes, phase);
//! the registry holds only a non-owning handle used for observability and
//! for closing sessions from outside the connection task.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Notify, RwLock};
use tracing::debug;
use uuid::Uuid;

pub type SessionId = Uuid;

/// Connection lifecycle. Every transition is logged by the connection task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionPhase::Connecting => write!(f, "connecting"),
            SessionPhase::Open => write!(f, "open"),
            SessionPhase::Closing => write!(f, "closing"),
            SessionPhase::Closed => write!(f, "closed"),
        }
    }
}

/// Non-owning reference to a live session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub id: SessionId,
    pub connected_at: DateTime<Utc>,
    close: Arc<Notify>,
}

impl SessionHandle {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            connected_at: Utc::now(),
            close: Arc::new(Notify::new()),
        }
    }

    /// Ask the connection task to close. Idempotent and safe from any task;
    /// the permit is retained so a close that races the task's startup still
    /// lands.
    pub fn close(&self) {
        self.close.notify_one();
    }

    /// The signal the owning connection task selects on.
    pub fn close_signal(&self) -> Arc<Notify> {
        self.close.clone()
    }
}

/// Tracks currently connected viewer sessions.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<SessionId, SessionHandle>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, handle: SessionHandle) {
        let mut sessions = self.sessions.write().await;
        debug!(session_id = %handle.id, "Session registered");
        sessions.insert(handle.id, handle);
    }

    /// Remove a session. Unknown ids are a no-op: disconnect races are
    /// expected, not errors.
    pub async fn unregister(&self, id: &SessionId) {
        let mut sessions = self.sessions.write().await;
        if sessions.remove(id).is_some() {
            debug!(session_id = %id, "Session unregistered");
        }
    }

    /// Signal one session to close; `false` if it was already gone.
    pub async fn close(&self, id: &SessionId) -> bool {
        let sessions = self.sessions.read().await;
        match sessions.get(id) {
            Some(handle) => {
                handle.close();
                true
            }
            None => false,
        }
    }

    /// Signal every live session to close (shutdown path).
    pub async fn close_all(&self) {
        let sessions = self.sessions.read().await;
        for handle in sessions.values() {
            handle.close();
        }
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
