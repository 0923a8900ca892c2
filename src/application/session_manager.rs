//! In-memory conversation sessions
//!
//! One active session per chat user, stamped with its start time. A periodic
//! sweep removes sessions older than the configured timeout so the bot can
//! tell the user their session expired.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session already active for user {0}")]
    AlreadyActive(u64),
}

/// One user's conversation session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    pub user_id: u64,
    pub started_at: DateTime<Utc>,
}

impl UserSession {
    pub fn age(&self, now: DateTime<Utc>) -> ChronoDuration {
        now - self.started_at
    }
}

#[derive(Debug, Clone)]
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<u64, UserSession>>>,
    timeout: Duration,
}

impl SessionManager {
    pub fn new(timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            timeout,
        }
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Start a session at `now`; fails when one is already active
    pub async fn begin(&self, user_id: u64, now: DateTime<Utc>) -> Result<UserSession, SessionError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&user_id) {
            return Err(SessionError::AlreadyActive(user_id));
        }

        let session = UserSession {
            user_id,
            started_at: now,
        };
        sessions.insert(user_id, session.clone());
        info!("Started session for user {}", user_id);
        Ok(session)
    }

    /// End a session; returns whether one was active
    pub async fn end(&self, user_id: u64) -> bool {
        let removed = self.sessions.write().await.remove(&user_id).is_some();
        if removed {
            debug!("Ended session for user {}", user_id);
        }
        removed
    }

    pub async fn is_active(&self, user_id: u64) -> bool {
        self.sessions.read().await.contains_key(&user_id)
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Remove and return every session older than the timeout at `now`
    pub async fn expire(&self, now: DateTime<Utc>) -> Vec<UserSession> {
        let limit = ChronoDuration::from_std(self.timeout).unwrap_or(ChronoDuration::MAX);
        let mut sessions = self.sessions.write().await;

        let expired: Vec<u64> = sessions
            .values()
            .filter(|s| s.age(now) > limit)
            .map(|s| s.user_id)
            .collect();

        let removed: Vec<UserSession> = expired.iter().filter_map(|id| sessions.remove(id)).collect();
        if !removed.is_empty() {
            info!("Expired {} sessions", removed.len());
        }
        removed
    }
}
