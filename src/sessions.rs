//! Session registry for refresh token tracking and revocation.
//!
//! Only refresh tokens are registered. Each entry is keyed by the refresh
//! token's JTI and lives until it is revoked, rotated away, or older than the
//! refresh lifetime. Stale entries are dropped lazily on lookup and by
//! `sweep`, which the cleanup scheduler runs periodically.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;

use parking_lot::Mutex;
use serde::Serialize;

use crate::jwt::unix_now;

/// Default upper bound on registered sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 100_000;

/// Metadata recorded for an outstanding refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    /// Nickname of the owner
    pub subject: String,
    /// Client IP at issue time
    pub ip: Option<String>,
    /// Client user agent at issue time
    pub user_agent: Option<String>,
    /// Unix timestamp of registration
    pub created_at: u64,
}

impl Session {
    /// Session created now.
    pub fn new(subject: &str, ip: Option<String>, user_agent: Option<String>) -> Self {
        Self {
            subject: subject.to_string(),
            ip,
            user_agent,
            created_at: unix_now().unwrap_or_default(),
        }
    }

    /// Override the creation time (normally the refresh token's `iat`).
    pub fn created_at(mut self, created_at: u64) -> Self {
        self.created_at = created_at;
        self
    }
}

/// A session together with its registry key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRecord {
    pub id: String,
    #[serde(flatten)]
    pub session: Session,
}

/// Errors reported by a session store backend.
#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

/// Storage contract for sessions. Implementations must be safe to share
/// between concurrently running requests.
pub trait SessionStore: Send + Sync + 'static {
    /// Insert or overwrite the session for `id`.
    fn register(
        &self,
        id: &str,
        session: Session,
    ) -> impl Future<Output = Result<(), SessionStoreError>> + Send;

    /// Fetch a live session.
    fn lookup(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<Session>, SessionStoreError>> + Send;

    /// Remove a session. Returns whether a live entry was removed.
    fn revoke(&self, id: &str) -> impl Future<Output = Result<bool, SessionStoreError>> + Send;

    /// Atomically replace `old_id` with `new_id`. Returns `false`, leaving the
    /// store untouched, if `old_id` is not a live session.
    fn rotate(
        &self,
        old_id: &str,
        new_id: &str,
        session: Session,
    ) -> impl Future<Output = Result<bool, SessionStoreError>> + Send;

    /// Live sessions, newest first, optionally restricted to one subject.
    fn list(
        &self,
        subject: Option<&str>,
    ) -> impl Future<Output = Result<Vec<SessionRecord>, SessionStoreError>> + Send;

    /// Drop all stale sessions. Returns how many were removed.
    fn sweep(&self) -> impl Future<Output = Result<usize, SessionStoreError>> + Send;
}

/// Sessions indexed by id and by age. Both indexes always hold the same ids.
#[derive(Default)]
struct Entries {
    by_id: HashMap<String, Session>,
    by_age: BTreeSet<(u64, String)>,
}

impl Entries {
    fn len(&self) -> usize {
        self.by_id.len()
    }

    fn get(&self, id: &str) -> Option<&Session> {
        self.by_id.get(id)
    }

    fn insert(&mut self, id: &str, session: Session) {
        self.remove(id);
        self.by_age.insert((session.created_at, id.to_string()));
        self.by_id.insert(id.to_string(), session);
    }

    fn remove(&mut self, id: &str) -> Option<Session> {
        let session = self.by_id.remove(id)?;
        self.by_age.remove(&(session.created_at, id.to_string()));
        Some(session)
    }

    fn oldest_created_at(&self) -> Option<u64> {
        self.by_age.first().map(|&(created_at, _)| created_at)
    }

    fn pop_oldest(&mut self) -> Option<Session> {
        let (_, id) = self.by_age.pop_first()?;
        self.by_id.remove(&id)
    }
}

/// In-memory, bounded session registry.
pub struct SessionRegistry {
    entries: Mutex<Entries>,
    lifetime: u64,
    capacity: usize,
}

impl SessionRegistry {
    /// `lifetime` is the refresh token lifetime in seconds; `capacity` is the
    /// maximum number of entries kept.
    pub fn new(lifetime: u64, capacity: usize) -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
            lifetime,
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().len() == 0
    }

    fn is_stale(&self, session: &Session, now: u64) -> bool {
        self.is_stale_at(session.created_at, now)
    }

    fn is_stale_at(&self, created_at: u64, now: u64) -> bool {
        created_at.saturating_add(self.lifetime) <= now
    }

    /// Stale entries are always the oldest, so they are popped from the front
    /// of the age index.
    fn drop_stale(&self, entries: &mut Entries, now: u64) -> usize {
        let mut removed = 0;
        while entries
            .oldest_created_at()
            .is_some_and(|created_at| self.is_stale_at(created_at, now))
        {
            entries.pop_oldest();
            removed += 1;
        }
        removed
    }

    /// Make room for one more entry: drop stale sessions, then the oldest.
    fn make_room(&self, entries: &mut Entries, now: u64) {
        if entries.len() < self.capacity {
            return;
        }
        self.drop_stale(entries, now);

        while entries.len() >= self.capacity {
            if entries.pop_oldest().is_none() {
                break;
            }
            tracing::warn!(
                capacity = self.capacity,
                "Session registry full, evicted oldest session"
            );
        }
    }

    fn insert(&self, entries: &mut Entries, id: &str, session: Session, now: u64) {
        if entries.get(id).is_none() {
            self.make_room(entries, now);
        }
        entries.insert(id, session);
    }
}

impl SessionStore for SessionRegistry {
    async fn register(&self, id: &str, session: Session) -> Result<(), SessionStoreError> {
        let now = unix_now().unwrap_or_default();
        let mut entries = self.entries.lock();
        self.insert(&mut entries, id, session, now);
        Ok(())
    }

    async fn lookup(&self, id: &str) -> Result<Option<Session>, SessionStoreError> {
        let now = unix_now().unwrap_or_default();
        let mut entries = self.entries.lock();
        match entries.get(id) {
            Some(session) if self.is_stale(session, now) => {
                entries.remove(id);
                Ok(None)
            }
            Some(session) => Ok(Some(session.clone())),
            None => Ok(None),
        }
    }

    async fn revoke(&self, id: &str) -> Result<bool, SessionStoreError> {
        let now = unix_now().unwrap_or_default();
        let removed = self.entries.lock().remove(id);
        Ok(removed.is_some_and(|s| !self.is_stale(&s, now)))
    }

    async fn rotate(
        &self,
        old_id: &str,
        new_id: &str,
        session: Session,
    ) -> Result<bool, SessionStoreError> {
        let now = unix_now().unwrap_or_default();
        let mut entries = self.entries.lock();
        let live = entries
            .get(old_id)
            .is_some_and(|old| !self.is_stale(old, now));
        if !live {
            return Ok(false);
        }
        entries.remove(old_id);
        self.insert(&mut entries, new_id, session, now);
        Ok(true)
    }

    async fn list(&self, subject: Option<&str>) -> Result<Vec<SessionRecord>, SessionStoreError> {
        let now = unix_now().unwrap_or_default();
        let entries = self.entries.lock();
        let records: Vec<SessionRecord> = entries
            .by_age
            .iter()
            .rev()
            .filter_map(|(_, id)| entries.by_id.get(id).map(|s| (id, s)))
            .filter(|(_, s)| !self.is_stale(s, now))
            .filter(|(_, s)| subject.is_none_or(|sub| s.subject == sub))
            .map(|(id, s)| SessionRecord {
                id: id.clone(),
                session: s.clone(),
            })
            .collect();
        Ok(records)
    }

    async fn sweep(&self) -> Result<usize, SessionStoreError> {
        let now = unix_now().unwrap_or_default();
        let mut entries = self.entries.lock();
        Ok(self.drop_stale(&mut entries, now))
    }
}
