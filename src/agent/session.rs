//! Per-user conversation sessions.
//!
//! One ephemeral session per active user, owned by the [`SessionManager`]
//! and never persisted: a restart simply drops in-progress flows and the
//! user re-invokes them. The manager is the only holder of the session
//! table; lookups take the session out of the table so no lock is held
//! across store I/O, and the engine puts it back if the flow continues.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::Mutex;

use crate::metrics::AggressionLevel;

/// Where in a conversation flow the user currently is.
///
/// Registration and daily entry share the session table; a user is in at
/// most one flow at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    AwaitingName,
    AwaitingAge,
    AwaitingSleep,
    AwaitingActivity,
    AwaitingAggression,
    AwaitingMood,
}

/// Answers accumulated so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Draft {
    pub name: Option<String>,
    pub sleep_hours: Option<f64>,
    pub activity_hours: Option<f64>,
    pub aggression: Option<AggressionLevel>,
}

/// One user's in-progress flow.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub stage: Stage,
    pub draft: Draft,
    /// Local date the daily entry is being recorded for; pinned when the
    /// flow is entered so a submission straddling midnight stays on the
    /// day the gate approved.
    pub entry_date: Option<NaiveDate>,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    pub fn registration(now: DateTime<Utc>) -> Self {
        Self {
            stage: Stage::AwaitingName,
            draft: Draft::default(),
            entry_date: None,
            last_activity: now,
        }
    }

    pub fn daily_entry(date: NaiveDate, now: DateTime<Utc>) -> Self {
        Self {
            stage: Stage::AwaitingSleep,
            draft: Draft::default(),
            entry_date: Some(date),
            last_activity: now,
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
    }

    pub fn is_expired(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        let idle = now.signed_duration_since(self.last_activity);
        idle.to_std().map_or(false, |idle| idle > timeout)
    }
}

/// Owner of the per-user session table.
pub struct SessionManager {
    sessions: Mutex<HashMap<String, Session>>,
    timeout: Duration,
}

impl SessionManager {
    pub fn new(timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    /// Remove and return the user's live session.
    ///
    /// An expired session is silently discarded, so the caller observes the
    /// same thing as "no session": the next action starts a fresh flow.
    pub async fn take(&self, user_id: &str, now: DateTime<Utc>) -> Option<Session> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.remove(user_id)?;
        if session.is_expired(now, self.timeout) {
            tracing::debug!(user_id, "Discarding expired session");
            return None;
        }
        Some(session)
    }

    /// Put a session (back) into the table.
    pub async fn put(&self, user_id: &str, session: Session) {
        let mut sessions = self.sessions.lock().await;
        sessions.insert(user_id.to_string(), session);
    }

    /// Drop the user's session, if any. Returns whether one existed
    /// (expired ones count as absent).
    pub async fn cancel(&self, user_id: &str, now: DateTime<Utc>) -> bool {
        let mut sessions = self.sessions.lock().await;
        match sessions.remove(user_id) {
            Some(session) => !session.is_expired(now, self.timeout),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 16, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn take_returns_live_session_once() {
        let manager = SessionManager::new(Duration::from_secs(1800));
        manager.put("u1", Session::registration(t0())).await;

        assert!(manager.take("u1", t0()).await.is_some());
        assert!(manager.take("u1", t0()).await.is_none());
    }

    #[tokio::test]
    async fn expired_session_is_discarded_on_take() {
        let manager = SessionManager::new(Duration::from_secs(1800));
        manager.put("u1", Session::registration(t0())).await;

        let later = t0() + chrono::Duration::minutes(31);
        assert!(manager.take("u1", later).await.is_none());
        // And it is gone, not resurrected.
        assert!(manager.take("u1", t0()).await.is_none());
    }

    #[tokio::test]
    async fn touch_extends_the_session() {
        let manager = SessionManager::new(Duration::from_secs(1800));
        let mut session = Session::registration(t0());
        session.touch(t0() + chrono::Duration::minutes(20));
        manager.put("u1", session).await;

        // 35 minutes after start but only 15 after the touch.
        let later = t0() + chrono::Duration::minutes(35);
        assert!(manager.take("u1", later).await.is_some());
    }

    #[tokio::test]
    async fn cancel_reports_whether_a_flow_was_active() {
        let manager = SessionManager::new(Duration::from_secs(1800));
        assert!(!manager.cancel("u1", t0()).await);

        manager.put("u1", Session::registration(t0())).await;
        assert!(manager.cancel("u1", t0()).await);
        assert!(!manager.cancel("u1", t0()).await);
    }

    #[test]
    fn daily_entry_starts_at_sleep_with_pinned_date() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let session = Session::daily_entry(date, t0());
        assert_eq!(session.stage, Stage::AwaitingSleep);
        assert_eq!(session.entry_date, Some(date));
        assert_eq!(session.draft, Draft::default());
    }
}
