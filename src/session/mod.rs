//! Session registry
//!
//! Tracks live optimization sessions and carries the pause/resume/cancel
//! control channel between callers and running agent loops. The store is the
//! only resource shared across session tasks; it is injected into the
//! orchestrator as a trait object so tests can substitute their own.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Notify;
use tokio::time::{timeout, Instant};

/// Lifecycle status of one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Running,
    Paused,
    Cancelled,
    Completed,
}

/// Registry view of one session
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: String,
    pub project_id: String,
    pub status: SessionStatus,
}

/// Result of a bounded wait on a paused session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The caller resumed the session
    Resumed,
    /// The caller cancelled the session, or it is no longer registered
    Cancelled,
    /// No decision arrived within the bound
    TimedOut,
}

/// Store of live sessions, safe for concurrent access from session tasks
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Register a new session; returns false if the id already exists
    fn register(&self, id: &str, project_id: &str) -> bool;

    /// Remove a session; returns false if it was not registered
    fn unregister(&self, id: &str) -> bool;

    /// Mark a session paused; no effect on unregistered ids
    fn pause(&self, id: &str) -> bool;

    /// Resume a paused session and wake its waiting loop
    fn resume(&self, id: &str) -> bool;

    /// Cancel a session and wake its waiting loop
    fn cancel(&self, id: &str) -> bool;

    /// Current view of a session, if registered
    fn get(&self, id: &str) -> Option<SessionInfo>;

    /// Block until the session is resumed, cancelled, or the bound elapses.
    ///
    /// Cancellation of an unregistered id and registry teardown both report
    /// [`WaitOutcome::Cancelled`]; the loop treats it like a timeout.
    async fn wait_for_resume(&self, id: &str, bound: Duration) -> WaitOutcome;
}

struct SessionEntry {
    info: SessionInfo,
    notify: Arc<Notify>,
}

/// In-memory session store backed by a mutex-guarded map
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, SessionEntry>>,
}

impl InMemorySessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of currently registered sessions
    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Whether no sessions are registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn set_status(&self, id: &str, status: SessionStatus, wake: bool) -> bool {
        let Ok(mut sessions) = self.sessions.lock() else {
            return false;
        };
        let Some(entry) = sessions.get_mut(id) else {
            return false;
        };
        entry.info.status = status;
        if wake {
            // notify_one stores a permit, so a waiter that checks status just
            // after this call still wakes.
            entry.notify.notify_one();
        }
        true
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    fn register(&self, id: &str, project_id: &str) -> bool {
        let Ok(mut sessions) = self.sessions.lock() else {
            return false;
        };
        if sessions.contains_key(id) {
            return false;
        }
        sessions.insert(
            id.to_string(),
            SessionEntry {
                info: SessionInfo {
                    id: id.to_string(),
                    project_id: project_id.to_string(),
                    status: SessionStatus::Running,
                },
                notify: Arc::new(Notify::new()),
            },
        );
        true
    }

    fn unregister(&self, id: &str) -> bool {
        let Ok(mut sessions) = self.sessions.lock() else {
            return false;
        };
        sessions.remove(id).is_some()
    }

    fn pause(&self, id: &str) -> bool {
        self.set_status(id, SessionStatus::Paused, false)
    }

    fn resume(&self, id: &str) -> bool {
        self.set_status(id, SessionStatus::Running, true)
    }

    fn cancel(&self, id: &str) -> bool {
        self.set_status(id, SessionStatus::Cancelled, true)
    }

    fn get(&self, id: &str) -> Option<SessionInfo> {
        self.sessions
            .lock()
            .ok()
            .and_then(|s| s.get(id).map(|e| e.info.clone()))
    }

    async fn wait_for_resume(&self, id: &str, bound: Duration) -> WaitOutcome {
        let deadline = Instant::now() + bound;
        loop {
            let (status, notify) = {
                let Ok(sessions) = self.sessions.lock() else {
                    return WaitOutcome::Cancelled;
                };
                match sessions.get(id) {
                    Some(entry) => (entry.info.status, entry.notify.clone()),
                    None => return WaitOutcome::Cancelled,
                }
            };

            match status {
                SessionStatus::Running | SessionStatus::Completed => return WaitOutcome::Resumed,
                SessionStatus::Cancelled => return WaitOutcome::Cancelled,
                SessionStatus::Paused => {}
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return WaitOutcome::TimedOut;
            }
            if timeout(remaining, notify.notified()).await.is_err() {
                return WaitOutcome::TimedOut;
            }
        }
    }
}
