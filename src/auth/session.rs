//! Server-side sessions with a bounded lifetime.
//!
//! [`Sessions`] is the shared store: a TTL map from random ids to session
//! records. [`CookieSession`] is the per-request handle the handlers and the
//! verifier talk to; it tracks whether the response must set or remove the
//! session cookie. The session id travels in the cookie, everything else
//! stays server-side.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "ensaluti_session";

#[derive(Clone, Debug)]
pub struct Session {
    subject: String,
    established_at: Instant,
    permanent: bool,
    expires_at: Instant,
}

impl Session {
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn established_at(&self) -> Instant {
        self.established_at
    }

    #[must_use]
    pub fn permanent(&self) -> bool {
        self.permanent
    }

    fn expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Shared session store with a fixed lifetime policy.
#[derive(Debug)]
pub struct Sessions {
    lifetime: Duration,
    entries: Mutex<HashMap<Uuid, Session>>,
}

impl Sessions {
    #[must_use]
    pub fn new(lifetime: Duration) -> Self {
        Self {
            lifetime,
            entries: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Create a session for `subject` and return its id. Expired entries are
    /// swept on each insert.
    pub fn create(&self, subject: &str, permanent: bool) -> Uuid {
        let id = Uuid::new_v4();
        let now = Instant::now();

        let mut entries = self.lock();
        entries.retain(|_, session| !session.expired_at(now));
        entries.insert(
            id,
            Session {
                subject: subject.to_string(),
                established_at: now,
                permanent,
                expires_at: now + self.lifetime,
            },
        );

        id
    }

    /// Look up a live session; an expired entry is dropped and reported as
    /// absent.
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<Session> {
        let now = Instant::now();
        let mut entries = self.lock();

        match entries.get(&id) {
            Some(session) if !session.expired_at(now) => Some(session.clone()),
            Some(_) => {
                entries.remove(&id);
                None
            }
            None => None,
        }
    }

    pub fn remove(&self, id: Uuid) {
        self.lock().remove(&id);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Session>> {
        match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// The minimal session contract the verifier depends on.
pub trait SessionStore: Send {
    fn establish(&mut self, subject: &str, permanent: bool);
    fn is_established(&self) -> bool;
    fn subject(&self) -> Option<String>;
    fn clear(&mut self);
}

/// Cookie action the response must carry after the handlers are done with the
/// session handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CookieChange {
    Established(Uuid),
    Cleared,
}

/// Per-request handle binding a request's session cookie to the shared store.
pub struct CookieSession {
    sessions: Arc<Sessions>,
    id: Option<Uuid>,
    change: Option<CookieChange>,
}

impl CookieSession {
    /// Build a handle from the session id the request presented, if any. Ids
    /// with no live entry behind them are treated as absent.
    #[must_use]
    pub fn from_cookie(sessions: Arc<Sessions>, id: Option<Uuid>) -> Self {
        let id = id.filter(|id| sessions.get(*id).is_some());
        Self {
            sessions,
            id,
            change: None,
        }
    }

    #[must_use]
    pub fn change(&self) -> Option<CookieChange> {
        self.change
    }
}

impl SessionStore for CookieSession {
    fn establish(&mut self, subject: &str, permanent: bool) {
        // A fresh id on every login; the previous session, if any, dies here.
        if let Some(old) = self.id.take() {
            self.sessions.remove(old);
        }

        let id = self.sessions.create(subject, permanent);
        self.id = Some(id);
        self.change = Some(CookieChange::Established(id));
    }

    fn is_established(&self) -> bool {
        self.id.is_some_and(|id| self.sessions.get(id).is_some())
    }

    fn subject(&self) -> Option<String> {
        self.id
            .and_then(|id| self.sessions.get(id))
            .map(|session| session.subject().to_string())
    }

    fn clear(&mut self) {
        if let Some(id) = self.id.take() {
            self.sessions.remove(id);
        }
        self.change = Some(CookieChange::Cleared);
    }
}

#[cfg(test)]
pub(crate) use memory::MemorySession;
