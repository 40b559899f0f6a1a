//! In-memory session registry

use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use super::clock::{Clock, SystemClock};

/// Sessions expire this many hours after creation, regardless of activity
const SESSION_TTL_HOURS: i64 = 24;

pub fn session_ttl() -> Duration {
    Duration::hours(SESSION_TTL_HOURS)
}

/// One authenticated binding to a Moodle host
#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: String,
    /// Normalized instance URL, always ending in `/`
    pub moodle_url: String,
    pub token: String,
    pub user_info: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
}

impl Session {
    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at > session_ttl()
    }

    /// Display name for greetings: full name, then username
    pub fn display_name(&self) -> Option<&str> {
        ["fullname", "username"]
            .iter()
            .filter_map(|key| self.user_info.get(*key).and_then(Value::as_str))
            .find(|name| !name.is_empty())
    }
}

/// Process-wide session registry
///
/// All access goes through one mutex. The lock is never held across an
/// `.await`, so remote calls made with a looked-up session do not block
/// other requests.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    /// Create a store backed by the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        // A panic while holding the lock cannot leave a half-written entry
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a new session and return its id
    pub fn create(
        &self,
        moodle_url: impl Into<String>,
        token: impl Into<String>,
        user_info: Map<String, Value>,
    ) -> String {
        let now = self.clock.now();
        let session_id = Uuid::new_v4().to_string();
        let session = Session {
            session_id: session_id.clone(),
            moodle_url: moodle_url.into(),
            token: token.into(),
            user_info,
            created_at: now,
            last_accessed_at: now,
        };

        let username = session
            .user_info
            .get("username")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        self.lock().insert(session_id.clone(), session);
        tracing::info!(session_id = %session_id, username = %username, "Created session");

        session_id
    }

    /// Look up a live session, touching its access time.
    ///
    /// An expired session is removed and reported as absent.
    pub fn get(&self, session_id: &str) -> Option<Session> {
        let now = self.clock.now();
        let mut sessions = self.lock();

        let expired = sessions.get(session_id)?.is_expired_at(now);
        if expired {
            sessions.remove(session_id);
            tracing::info!(session_id = %session_id, "Evicted expired session on lookup");
            return None;
        }

        let session = sessions.get_mut(session_id)?;
        session.last_accessed_at = now;
        Some(session.clone())
    }

    /// Remove a session. Returns whether one was removed.
    pub fn delete(&self, session_id: &str) -> bool {
        let removed = self.lock().remove(session_id).is_some();
        if removed {
            tracing::info!(session_id = %session_id, "Deleted session");
        }
        removed
    }

    /// Evict every session past its TTL and return how many were evicted
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut sessions = self.lock();
        let before = sessions.len();

        sessions.retain(|session_id, session| {
            let keep = !session.is_expired_at(now);
            if !keep {
                tracing::info!(session_id = %session_id, "Cleaned up expired session");
            }
            keep
        });

        before - sessions.len()
    }

    /// Number of held sessions, including expired ones not yet swept
    pub fn count(&self) -> usize {
        self.lock().len()
    }

    /// Drop every session
    pub fn clear(&self) -> usize {
        let mut sessions = self.lock();
        let dropped = sessions.len();
        sessions.clear();
        dropped
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
