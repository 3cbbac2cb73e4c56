//! The discovery query engine.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use matchbook_protocol::{DirectoryQuery, GameStatus, HomeQuery};
use matchbook_session::{
    Clock, Session, SessionFilter, SessionStore, StoreError, sort_for_discovery,
};

/// Returns the instant at or before which a last ping counts as stale.
///
/// The boundary is inclusive: a game pinged exactly `ttl_minutes` ago is
/// already stale.
pub fn stale_cutoff(now: DateTime<Utc>, ttl_minutes: u32) -> DateTime<Utc> {
    now - Duration::minutes(i64::from(ttl_minutes))
}

/// Builds filtered, ordered listings from a [`SessionStore`].
///
/// Read-only and stateless: cheap to clone, safe to share.
pub struct Discovery<S> {
    /// Shared with the lifecycle; discovery only ever calls `query`.
    store: Arc<S>,
    /// Only the stale listings read it.
    clock: Arc<dyn Clock>,
}

impl<S> Clone for Discovery<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S: SessionStore> Discovery<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// The human-facing listing.
    ///
    /// Statuses default to `{WAITING}`. No version partitioning: people
    /// browsing the page want to see everything being played.
    pub async fn home(&self, query: &HomeQuery) -> Result<Vec<Session>, StoreError> {
        let filter = SessionFilter::new()
            .statuses(query.effective_statuses())
            .country(query.country)
            .name_contains(query.name.as_deref());
        self.list(&filter).await
    }

    /// The programmatic directory: waiting games of exactly `version`.
    ///
    /// Status and version are separate predicates, both applied. A game
    /// of another version never shows up, whatever its status.
    pub async fn directory(&self, query: &DirectoryQuery) -> Result<Vec<Session>, StoreError> {
        // A blank version is turned away before this point; here it would
        // only match games advertised with an empty version.
        let filter = SessionFilter::new()
            .statuses([GameStatus::Waiting])
            .version(query.version.trim())
            .country(query.country)
            .name_contains(query.name.as_deref());
        self.list(&filter).await
    }

    /// Unfinished games not pinged in the last `ttl_minutes`.
    ///
    /// `FINISHED` games are history and never go stale.
    pub async fn stale(&self, ttl_minutes: u32) -> Result<Vec<Session>, StoreError> {
        self.stale_at(stale_cutoff(self.clock.now(), ttl_minutes)).await
    }

    /// Unfinished games whose last ping is at or before `cutoff`.
    pub async fn stale_at(&self, cutoff: DateTime<Utc>) -> Result<Vec<Session>, StoreError> {
        let filter = SessionFilter::new()
            .statuses([GameStatus::Waiting, GameStatus::Playing])
            .pinged_at_or_before(cutoff);
        self.list(&filter).await
    }

    /// Runs `filter` against the store and puts the result in listing
    /// order. Stores return matches unordered.
    async fn list(&self, filter: &SessionFilter) -> Result<Vec<Session>, StoreError> {
        let mut sessions = self.store.query(filter).await.map_err(|e| {
            tracing::error!(error = %e, "listing query failed");
            e
        })?;
        sort_for_discovery(&mut sessions);
        tracing::debug!(matched = sessions.len(), ?filter, "listing built");
        Ok(sessions)
    }
}
