//! The session store contract and an in-memory implementation.
//!
//! The lifecycle never talks to a database directly. It is written
//! against [`SessionStore`], which a relational backend, a key-value
//! backend, or [`MemoryStore`] can implement.
//!
//! # Atomicity
//!
//! Read-check-write sequences are pushed *into* the store: [`modify`]
//! and [`remove_if`] take a closure that runs while the store holds the
//! record exclusively. The closure sees the committed state, decides,
//! and either mutates a copy (committed only if the closure succeeds)
//! or rejects. A concurrent terminal transition or deletion can't slip
//! in between the check and the write.
//!
//! [`modify`]: SessionStore::modify
//! [`remove_if`]: SessionStore::remove_if

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use matchbook_protocol::{CountryCode, GameStatus, SessionId};
use tokio::sync::RwLock;

use crate::{NewSession, Session, SessionError, StoreError};

/// Persistence for sessions: one record type keyed by id, unique on
/// address.
///
/// Implementations must reject any insert or modification that would
/// give two sessions the same `address`, reporting
/// [`StoreError::Conflict`] (or [`SessionError::Conflict`] from
/// `modify`).
pub trait SessionStore: Send + Sync + 'static {
    /// Stores a new session and assigns its id.
    fn insert(
        &self,
        new: NewSession,
    ) -> impl std::future::Future<Output = Result<Session, StoreError>> + Send;

    /// Looks up a session by id. `Ok(None)` if it doesn't exist.
    fn get(
        &self,
        id: SessionId,
    ) -> impl std::future::Future<Output = Result<Option<Session>, StoreError>> + Send;

    /// Atomically applies `apply` to the stored session.
    ///
    /// `apply` receives a copy of the committed record. If it returns
    /// `Ok`, the copy replaces the record and is returned; if it returns
    /// `Err`, nothing is written and the error is passed through.
    ///
    /// # Errors
    /// - [`SessionError::NotFound`]: no session with this id
    /// - [`SessionError::Conflict`]: the new address is taken
    /// - whatever `apply` returns
    fn modify<F>(
        &self,
        id: SessionId,
        apply: F,
    ) -> impl std::future::Future<Output = Result<Session, SessionError>> + Send
    where
        F: FnOnce(&mut Session) -> Result<(), SessionError> + Send;

    /// Atomically removes the session if `check` accepts it, returning
    /// the removed record.
    fn remove_if<F>(
        &self,
        id: SessionId,
        check: F,
    ) -> impl std::future::Future<Output = Result<Session, SessionError>> + Send
    where
        F: FnOnce(&Session) -> Result<(), SessionError> + Send;

    /// Returns every session matching `filter`, in no particular order.
    fn query(
        &self,
        filter: &SessionFilter,
    ) -> impl std::future::Future<Output = Result<Vec<Session>, StoreError>> + Send;
}

// ---------------------------------------------------------------------------
// SessionFilter
// ---------------------------------------------------------------------------

/// A conjunction of optional predicates over sessions.
///
/// Every field that is set must match; unset fields match everything.
/// A SQL backend translates this to a `WHERE` clause, [`MemoryStore`]
/// evaluates [`SessionFilter::matches`] directly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionFilter {
    /// Status must be one of these.
    pub statuses: Option<Vec<GameStatus>>,
    /// Version must be exactly this.
    pub version: Option<String>,
    /// Country must be exactly this. Unresolved sessions never match.
    pub country: Option<CountryCode>,
    /// Name must contain this, ignoring case. Held lowercased; set it
    /// through [`name_contains`](Self::name_contains).
    pub name_contains: Option<String>,
    /// Last ping must be at or before this instant.
    pub pinged_at_or_before: Option<DateTime<Utc>>,
}

impl SessionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statuses(mut self, statuses: impl IntoIterator<Item = GameStatus>) -> Self {
        self.statuses = Some(statuses.into_iter().collect());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn country(mut self, country: Option<CountryCode>) -> Self {
        self.country = country;
        self
    }

    /// Blank needles are dropped: an empty search box means "any name".
    /// The needle is kept lowercased so [`matches`](Self::matches) only
    /// has to fold the session's name.
    pub fn name_contains(mut self, needle: Option<&str>) -> Self {
        self.name_contains = needle
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_lowercase);
        self
    }

    pub fn pinged_at_or_before(mut self, cutoff: DateTime<Utc>) -> Self {
        self.pinged_at_or_before = Some(cutoff);
        self
    }

    /// Evaluates every set predicate against `session`.
    pub fn matches(&self, session: &Session) -> bool {
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&session.status) {
                return false;
            }
        }
        if let Some(version) = &self.version {
            if session.version != *version {
                return false;
            }
        }
        if let Some(country) = &self.country {
            if session.country.as_ref() != Some(country) {
                return false;
            }
        }
        if let Some(needle) = &self.name_contains {
            if !session.name.to_lowercase().contains(needle.as_str()) {
                return false;
            }
        }
        if let Some(cutoff) = self.pinged_at_or_before {
            if session.last_ping_at > cutoff {
                return false;
            }
        }
        true
    }
}

/// Orders sessions the way every listing presents them: longest idle
/// first, then by name, then by id.
pub fn sort_for_discovery(sessions: &mut [Session]) {
    sessions.sort_by(|a, b| {
        a.last_ping_at
            .cmp(&b.last_ping_at)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    });
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// An in-process [`SessionStore`].
///
/// One `RwLock` guards both the records and the address index, so the
/// uniqueness check and the write it protects are never separated.
/// Ids are sequential and never reused.
#[derive(Debug)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    next_id: AtomicU64,
}

#[derive(Debug, Default)]
struct Inner {
    sessions: HashMap<SessionId, Session>,
    /// address → owner. Kept in sync with `sessions`.
    addresses: HashMap<String, SessionId>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Inserts a fully-formed record as-is, keeping its id.
    ///
    /// Used to seed fixtures and to load snapshots; the lifecycle always
    /// goes through [`SessionStore::insert`].
    pub async fn restore(&self, session: Session) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(owner) = inner.addresses.get(&session.address) {
            if *owner != session.id {
                return Err(StoreError::Conflict {
                    address: session.address,
                });
            }
        }
        self.next_id.fetch_max(session.id.0 + 1, Ordering::Relaxed);
        if let Some(old) = inner.sessions.get(&session.id).map(|s| s.address.clone()) {
            inner.addresses.remove(&old);
        }
        inner.addresses.insert(session.address.clone(), session.id);
        inner.sessions.insert(session.id, session);
        Ok(())
    }

    /// Number of stored sessions.
    pub async fn len(&self) -> usize {
        self.inner.read().await.sessions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for MemoryStore {
    async fn insert(&self, new: NewSession) -> Result<Session, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.addresses.contains_key(&new.address) {
            return Err(StoreError::Conflict {
                address: new.address,
            });
        }

        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let session = new.into_session(id);
        inner.addresses.insert(session.address.clone(), id);
        inner.sessions.insert(id, session.clone());
        Ok(session)
    }

    async fn get(&self, id: SessionId) -> Result<Option<Session>, StoreError> {
        Ok(self.inner.read().await.sessions.get(&id).cloned())
    }

    async fn modify<F>(&self, id: SessionId, apply: F) -> Result<Session, SessionError>
    where
        F: FnOnce(&mut Session) -> Result<(), SessionError> + Send,
    {
        let mut guard = self.inner.write().await;
        let Inner {
            sessions,
            addresses,
        } = &mut *guard;

        // `apply` works on a copy; the stored record is only replaced once
        // it and the checks below have all passed.
        let current = sessions.get(&id).ok_or(SessionError::NotFound(id))?;
        let old_address = current.address.clone();
        let mut next = current.clone();
        apply(&mut next)?;

        if next.id != id {
            return Err(SessionError::Validation("a game id is immutable".into()));
        }
        if next.address != old_address {
            if let Some(owner) = addresses.get(&next.address) {
                if *owner != id {
                    return Err(SessionError::Conflict(next.address));
                }
            }
            // Re-key the index so the old address is free for a new game.
            addresses.remove(&old_address);
            addresses.insert(next.address.clone(), id);
        }

        sessions.insert(id, next.clone());
        Ok(next)
    }

    async fn remove_if<F>(&self, id: SessionId, check: F) -> Result<Session, SessionError>
    where
        F: FnOnce(&Session) -> Result<(), SessionError> + Send,
    {
        let mut guard = self.inner.write().await;
        let Inner {
            sessions,
            addresses,
        } = &mut *guard;

        // Checked under the same write lock as the removal, so `check`
        // sees the record that is about to go.
        let current = sessions.get(&id).ok_or(SessionError::NotFound(id))?;
        check(current)?;

        let removed = sessions.remove(&id).ok_or(SessionError::NotFound(id))?;
        addresses.remove(&removed.address);
        Ok(removed)
    }

    async fn query(&self, filter: &SessionFilter) -> Result<Vec<Session>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .sessions
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect())
    }
}

// =========================================================================
// Tests
// =========================================================================
