//! The lifecycle engine: creates, updates, and deletes sessions.
//!
//! Every mutation follows the same shape:
//!
//! ```text
//! validate input ──→ resolve location (best-effort, outside any lock)
//!        │
//!        ▼
//! store.modify / store.remove_if
//!   ├─ exists?            else NotFound
//!   ├─ not FINISHED?      else TerminalState
//!   ├─ token matches?     else Unauthorized
//!   ├─ transition valid?  else RedundantTransition / Validation
//!   └─ apply + commit     (all or nothing)
//! ```
//!
//! The checks run inside the store's atomic section, against the
//! committed record, so two racing requests can't both act on a stale
//! view of the same session.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use matchbook_protocol::{CountryCode, GameStatus, SessionId, UpdateSession, Winner};
use rand::Rng;

use crate::{Clock, LocationResolver, NewSession, Session, SessionError, SessionStore};

// ---------------------------------------------------------------------------
// LifecycleConfig
// ---------------------------------------------------------------------------

/// Limits applied to client-supplied fields.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Longest accepted display name, in characters.
    pub max_name_len: usize,
    /// Longest accepted version tag, in characters.
    pub max_version_len: usize,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            max_name_len: 255,
            max_version_len: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionPatch
// ---------------------------------------------------------------------------

/// The optional fields of an update request.
///
/// Blank `name`/`version` values count as "not supplied". `winner` is
/// only read when `status` is `FINISHED`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionPatch {
    pub name: Option<String>,
    pub version: Option<String>,
    pub status: Option<GameStatus>,
    pub winner: Option<Winner>,
}

impl SessionPatch {
    /// Splits a wire request into its token and the patch.
    pub fn from_request(req: UpdateSession) -> (String, Self) {
        let patch = Self {
            name: req.name,
            version: req.version,
            status: req.status,
            winner: req.winner,
        };
        (req.token, patch)
    }

    /// A patch that only refreshes `last_ping_at`.
    pub fn ping() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: GameStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn finish(mut self, winner: Winner) -> Self {
        self.status = Some(GameStatus::Finished);
        self.winner = Some(winner);
        self
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Applies the session state machine on top of a [`SessionStore`].
///
/// Stateless between calls: everything lives in the store, so one
/// `Lifecycle` can serve every request concurrently.
pub struct Lifecycle<S, R> {
    store: Arc<S>,
    resolver: R,
    clock: Arc<dyn Clock>,
    config: LifecycleConfig,
}

impl<S: SessionStore, R: LocationResolver> Lifecycle<S, R> {
    pub fn new(store: Arc<S>, resolver: R, clock: Arc<dyn Clock>, config: LifecycleConfig) -> Self {
        Self {
            store,
            resolver,
            clock,
            config,
        }
    }

    /// The store this lifecycle writes to.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Registers a new `WAITING` game for `address`.
    ///
    /// # Errors
    /// - [`SessionError::Validation`]: blank or oversized name/version
    /// - [`SessionError::Conflict`]: `address` already has a game
    pub async fn create(
        &self,
        name: &str,
        version: &str,
        address: &str,
    ) -> Result<Session, SessionError> {
        let name = required("name", name, self.config.max_name_len)?;
        let version = required("version", version, self.config.max_version_len)?;
        let address = address.trim();
        if address.is_empty() {
            return Err(SessionError::Validation("the caller address is unknown".into()));
        }

        let country = self.locate(address).await;
        let new = NewSession {
            token: generate_token(),
            name,
            address: address.to_string(),
            country,
            version,
            created_at: self.clock.now(),
        };

        let session = self.store.insert(new).await.map_err(|e| logged(e.into()))?;

        tracing::info!(
            session_id = %session.id,
            address = %session.address,
            version = %session.version,
            "game created"
        );
        Ok(session)
    }

    /// Looks up a session.
    pub async fn get(&self, id: SessionId) -> Result<Session, SessionError> {
        self.store
            .get(id)
            .await
            .map_err(|e| logged(e.into()))?
            .ok_or(SessionError::NotFound(id))
    }

    /// Applies `patch` to the session `id` on behalf of the token holder
    /// calling from `address`.
    ///
    /// Always refreshes `last_ping_at`, so an empty patch works as a
    /// keep-alive.
    pub async fn update(
        &self,
        id: SessionId,
        token: &str,
        patch: SessionPatch,
        address: &str,
    ) -> Result<Session, SessionError> {
        // Fail fast on the snapshot so rejected callers never trigger a
        // location lookup. The checks run again inside `modify`.
        let snapshot = self.get(id).await?;
        check_owner(&snapshot, token, "updated")?;

        let address = address.trim();
        // `Some` once the caller's address has been looked up. The lookup
        // is only paid for when the caller seems to have moved.
        let mut resolved = if !address.is_empty() && snapshot.address != address {
            Some(self.locate(address).await)
        } else {
            None
        };
        let now = self.clock.now();
        let config = &self.config;

        let mut result = self
            .store
            .modify(id, |session| {
                apply_update(session, token, &patch, address, resolved, now, config)
            })
            .await;

        // The committed record moved away from the snapshot's address
        // before `modify` ran, so the caller's address does need a
        // country after all. Look it up outside the lock and run the
        // whole update again against the fresh record. The second run
        // always carries a lookup and can't end up here.
        if matches!(result, Err(SessionError::MovedMeanwhile(_))) {
            tracing::debug!(session_id = %id, "game moved during update, retrying");
            resolved = Some(self.locate(address).await);
            result = self
                .store
                .modify(id, |session| {
                    apply_update(session, token, &patch, address, resolved, now, config)
                })
                .await;
        }

        match result {
            Ok(session) => {
                tracing::info!(
                    session_id = %id,
                    status = %session.status,
                    "game updated"
                );
                Ok(session)
            }
            Err(e) => {
                tracing::debug!(session_id = %id, error = %e, "update rejected");
                Err(logged(e))
            }
        }
    }

    /// Removes the session `id` on behalf of the token holder.
    pub async fn delete(&self, id: SessionId, token: &str) -> Result<(), SessionError> {
        match self
            .store
            .remove_if(id, |session| check_owner(session, token, "deleted"))
            .await
        {
            Ok(_) => {
                tracing::info!(session_id = %id, "game deleted");
                Ok(())
            }
            Err(e) => {
                tracing::debug!(session_id = %id, error = %e, "delete rejected");
                Err(logged(e))
            }
        }
    }

    async fn locate(&self, address: &str) -> Option<CountryCode> {
        let country = self.resolver.resolve(address).await;
        if country.is_none() {
            tracing::debug!(address, "country unresolved");
        }
        country
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// The preconditions shared by update and delete, in order: not
/// finished, then token.
fn check_owner(session: &Session, token: &str, action: &'static str) -> Result<(), SessionError> {
    if session.status.is_terminal() {
        return Err(SessionError::TerminalState {
            id: session.id,
            action,
        });
    }
    if session.token != token {
        return Err(SessionError::Unauthorized);
    }
    Ok(())
}

/// Validates `patch` against the committed `session` and applies it.
///
/// Everything is validated before the first field is written.
/// `resolved` is the lookup result for `address`, or `None` if no lookup
/// was done. Moving the session to `address` without a lookup is
/// refused with [`SessionError::MovedMeanwhile`] so the caller can
/// resolve and retry.
fn apply_update(
    session: &mut Session,
    token: &str,
    patch: &SessionPatch,
    address: &str,
    resolved: Option<Option<CountryCode>>,
    now: DateTime<Utc>,
    config: &LifecycleConfig,
) -> Result<(), SessionError> {
    check_owner(session, token, "updated")?;
    if resolved.is_none() && !address.is_empty() && session.address != address {
        // No lookup was done for `address`: the caller can't know its
        // country yet.
        return Err(SessionError::MovedMeanwhile(session.id));
    }

    if let Some(target) = patch.status {
        if target == session.status {
            return Err(SessionError::RedundantTransition {
                id: session.id,
                status: target,
            });
        }
        if !session.status.can_advance_to(target) {
            return Err(SessionError::Validation(format!(
                "status cannot move from {} to {}, it can be one of: PLAYING, FINISHED",
                session.status, target
            )));
        }
        if target == GameStatus::Finished && patch.winner.is_none() {
            return Err(SessionError::Validation(
                "a winner is required to finish a game, it can be one of: RED, YELLOW".into(),
            ));
        }
    }
    let name = optional("name", patch.name.as_deref(), config.max_name_len)?;
    let version = optional("version", patch.version.as_deref(), config.max_version_len)?;

    if let Some(target) = patch.status {
        session.status = target;
        match target {
            GameStatus::Playing => session.started_at = Some(now),
            GameStatus::Finished => {
                // A game abandoned straight from WAITING still gets a start.
                session.started_at.get_or_insert(now);
                session.finished_at = Some(now);
                session.winner = patch.winner;
            }
            GameStatus::Waiting => {}
        }
    }
    if let Some(name) = name {
        session.name = name;
    }
    if let Some(version) = version {
        session.version = version;
    }
    session.last_ping_at = now;

    if !address.is_empty() && session.address != address {
        session.address = address.to_string();
        session.country = resolved.flatten();
    }
    Ok(())
}

fn required(field: &str, value: &str, max: usize) -> Result<String, SessionError> {
    optional(field, Some(value), max)?
        .ok_or_else(|| SessionError::Validation(format!("missing required parameter: {field}")))
}

fn optional(field: &str, value: Option<&str>, max: usize) -> Result<Option<String>, SessionError> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if value.chars().count() > max {
        return Err(SessionError::Validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(Some(value.to_string()))
}

/// Store failures are the only errors worth an error-level log; the
/// rest are the caller's fault.
fn logged(err: SessionError) -> SessionError {
    if let SessionError::Store(cause) = &err {
        tracing::error!(error = %cause, "session store failure");
    }
    err
}

/// Generates a random 32-character hex string (128 bits of entropy).
fn generate_token() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// =========================================================================
// Tests
// =========================================================================
