//! Per-user transient interaction state.
//!
//! Sessions are process-local and lost on restart, which is acceptable:
//! the worst case is a user re-picking an activity. The store is an
//! explicit value injected into the controller, keyed by user id, with
//! inactivity eviction.

use chrono::NaiveDate;
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Where a user is in a multi-step flow.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Mode {
    #[default]
    Idle,
    AwaitingNewActivityName,
    AwaitingRatingStars {
        activity: String,
    },
    AwaitingAliasText,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    pub mode: Mode,
    /// Explicit date override; `None` means "logical today". Survives
    /// completed rating flows until the user returns to today.
    pub target_date: Option<NaiveDate>,
    last_seen: Option<Instant>,
}

impl Session {
    /// Ends the current flow, keeping any date override.
    pub fn end_flow(&mut self) {
        self.mode = Mode::Idle;
    }
}

#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<i64, Session>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
            ttl: SESSION_TTL,
        }
    }

    /// The user's session, created on first contact. Stale sessions are
    /// evicted on the way in.
    pub fn session(&mut self, user_id: i64) -> &mut Session {
        self.session_at(user_id, Instant::now())
    }

    fn session_at(&mut self, user_id: i64, now: Instant) -> &mut Session {
        let ttl = self.ttl;
        self.sessions.retain(|_, session| {
            session
                .last_seen
                .is_none_or(|seen| now.duration_since(seen) < ttl)
        });

        let session = self.sessions.entry(user_id).or_default();
        session.last_seen = Some(now);
        session
    }

    #[cfg(test)]
    fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            ttl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Mode, SessionStore};
    use std::time::{Duration, Instant};

    #[test]
    fn creates_idle_session_on_first_contact() {
        let mut store = SessionStore::new();
        let session = store.session(1);
        assert_eq!(session.mode, Mode::Idle);
        assert_eq!(session.target_date, None);
    }

    #[test]
    fn sessions_are_independent_per_user() {
        let mut store = SessionStore::new();
        store.session(1).mode = Mode::AwaitingNewActivityName;

        assert_eq!(store.session(2).mode, Mode::Idle);
        assert_eq!(store.session(1).mode, Mode::AwaitingNewActivityName);
    }

    #[test]
    fn end_flow_keeps_date_override() {
        let mut store = SessionStore::new();
        let session = store.session(1);
        session.target_date = chrono::NaiveDate::from_ymd_opt(2024, 3, 9);
        session.mode = Mode::AwaitingRatingStars {
            activity: "йога".to_string(),
        };

        session.end_flow();
        assert_eq!(session.mode, Mode::Idle);
        assert!(session.target_date.is_some());
    }

    #[test]
    fn stale_sessions_are_evicted() {
        let mut store = SessionStore::with_ttl(Duration::from_secs(60));
        let start = Instant::now();

        store.session_at(1, start).mode = Mode::AwaitingAliasText;

        let later = start + Duration::from_secs(120);
        assert_eq!(store.session_at(1, later).mode, Mode::Idle);
    }
}
