//! `Directory` builder and boundary-level operations.
//!
//! This is the entry point for a request layer. It ties the layers
//! together: protocol requests in, lifecycle and discovery in the middle,
//! public or private views out.

use std::sync::Arc;

use matchbook_discovery::Discovery;
use matchbook_protocol::{
    CreateSession, DeleteSession, DirectoryQuery, HomeQuery, PrivateSession, PublicSession,
    SessionId, UpdateSession,
};
use matchbook_reaper::{Reaper, ReaperConfig, ReaperHandle, SweepReport};
use matchbook_session::{
    Clock, Lifecycle, LifecycleConfig, LocationResolver, Session, SessionError, SessionPatch,
    SessionStore, SystemClock,
};

use crate::MatchbookError;

/// Builder for assembling a [`Directory`].
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
///
/// use matchbook::prelude::*;
///
/// let directory = DirectoryBuilder::new()
///     .reaper_config(ReaperConfig::with_ttl(10))
///     .build(Arc::new(MemoryStore::new()), NullResolver);
/// assert_eq!(directory.reaper_config().ttl_minutes, 10);
/// ```
pub struct DirectoryBuilder {
    clock: Arc<dyn Clock>,
    lifecycle_config: LifecycleConfig,
    reaper_config: ReaperConfig,
}

impl DirectoryBuilder {
    /// Creates a builder with the system clock and default settings.
    pub fn new() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            lifecycle_config: LifecycleConfig::default(),
            reaper_config: ReaperConfig::default(),
        }
    }

    /// Replaces the wall clock, e.g. with a `ManualClock` in tests.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sets the input limits for names and versions.
    pub fn lifecycle_config(mut self, config: LifecycleConfig) -> Self {
        self.lifecycle_config = config;
        self
    }

    /// Sets the staleness TTL and sweep interval.
    pub fn reaper_config(mut self, config: ReaperConfig) -> Self {
        self.reaper_config = config.validated();
        self
    }

    /// Wires everything on top of `store` and `resolver`.
    pub fn build<S, R>(self, store: Arc<S>, resolver: R) -> Directory<S, R>
    where
        S: SessionStore,
        R: LocationResolver,
    {
        let discovery = Discovery::new(Arc::clone(&store), Arc::clone(&self.clock));
        let lifecycle = Lifecycle::new(
            Arc::clone(&store),
            resolver,
            Arc::clone(&self.clock),
            self.lifecycle_config,
        );
        Directory {
            store,
            lifecycle,
            discovery,
            clock: self.clock,
            reaper_config: self.reaper_config,
        }
    }
}

impl Default for DirectoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The game-session directory.
///
/// Every method takes and returns wire types. `caller` is the address
/// the request came from, as returned by
/// [`client_address`](matchbook_protocol::client_address).
pub struct Directory<S, R> {
    store: Arc<S>,
    lifecycle: Lifecycle<S, R>,
    discovery: Discovery<S>,
    clock: Arc<dyn Clock>,
    reaper_config: ReaperConfig,
}

impl<S, R> Directory<S, R>
where
    S: SessionStore,
    R: LocationResolver,
{
    pub fn reaper_config(&self) -> &ReaperConfig {
        &self.reaper_config
    }

    /// Advertises a new game. The returned view carries the token; it is
    /// the only time the token is ever sent.
    pub async fn create(
        &self,
        req: CreateSession,
        caller: &str,
    ) -> Result<PrivateSession, MatchbookError> {
        let session = self.lifecycle.create(&req.name, &req.version, caller).await?;
        Ok(session.into_private())
    }

    pub async fn get(&self, id: SessionId) -> Result<PublicSession, MatchbookError> {
        Ok(self.lifecycle.get(id).await?.to_public())
    }

    /// Pings, renames, or advances a game on behalf of its token holder.
    pub async fn update(
        &self,
        id: SessionId,
        req: UpdateSession,
        caller: &str,
    ) -> Result<PublicSession, MatchbookError> {
        let (token, patch) = SessionPatch::from_request(req);
        let session = self.lifecycle.update(id, &token, patch, caller).await?;
        Ok(session.to_public())
    }

    pub async fn delete(&self, id: SessionId, req: DeleteSession) -> Result<(), MatchbookError> {
        Ok(self.lifecycle.delete(id, &req.token).await?)
    }

    /// The human-facing listing.
    pub async fn home(&self, query: &HomeQuery) -> Result<Vec<PublicSession>, MatchbookError> {
        Ok(public(self.discovery.home(query).await?))
    }

    /// The programmatic listing of joinable games for one client version.
    ///
    /// `version` is required; a blank one is a validation error rather
    /// than an empty listing.
    pub async fn directory(
        &self,
        query: &DirectoryQuery,
    ) -> Result<Vec<PublicSession>, MatchbookError> {
        if query.version.trim().is_empty() {
            let missing = SessionError::Validation("missing required parameter: version".into());
            return Err(missing.into());
        }
        Ok(public(self.discovery.directory(query).await?))
    }

    /// A reaper over the same store, clock, and configuration.
    pub fn reaper(&self) -> Reaper<S> {
        Reaper::new(
            Arc::clone(&self.store),
            Arc::clone(&self.clock),
            self.reaper_config.clone(),
        )
    }

    /// Runs one sweep with the configured TTL.
    pub async fn sweep(&self) -> Result<SweepReport, MatchbookError> {
        Ok(self.reaper().sweep_now().await?)
    }

    /// Starts sweeping periodically in the background.
    pub fn spawn_reaper(&self) -> ReaperHandle {
        self.reaper().spawn()
    }
}

fn public(sessions: Vec<Session>) -> Vec<PublicSession> {
    sessions.iter().map(Session::to_public).collect()
}
