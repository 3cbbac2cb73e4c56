//! The session entity: one advertised game.
//!
//! A session tracks:
//! - WHO can change it (the secret `token` handed to the creator)
//! - WHERE it is played from (`address`, and the `country` derived from it)
//! - WHAT state the game is in (`status`, and `winner` once finished)
//! - WHEN things happened (creation, last ping, start, finish)

use std::fmt;

use chrono::{DateTime, Utc};
use matchbook_protocol::{
    CountryCode, GameStatus, PrivateSession, PublicSession, SessionId, Winner,
};

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A single advertised game session.
///
/// Invariants maintained by the [`Lifecycle`](crate::Lifecycle):
/// - `winner.is_some()` iff `status == FINISHED`
/// - `started_at.is_some()` iff `status` is `PLAYING` or `FINISHED`
/// - `finished_at.is_some()` iff `status == FINISHED`
///
/// `Debug` is implemented by hand so the token never ends up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    /// Ownership secret. Only ever shown to the creator.
    pub token: String,
    pub name: String,
    /// Client IP as last observed. Unique among stored sessions.
    pub address: String,
    /// Derived from `address`. `None` when the resolver couldn't tell.
    pub country: Option<CountryCode>,
    /// Client compatibility tag; the programmatic directory only lists
    /// games with the caller's version.
    pub version: String,
    pub status: GameStatus,
    pub winner: Option<Winner>,
    pub created_at: DateTime<Utc>,
    /// Stamped on every accepted update. Drives staleness.
    pub last_ping_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Human-readable status (`"Waiting"`).
    pub fn status_label(&self) -> &'static str {
        self.status.label()
    }

    /// Human-readable winner (`"Red"`), if the game is finished.
    pub fn winner_label(&self) -> Option<&'static str> {
        self.winner.map(Winner::label)
    }

    /// English name of the country, or `None` when it is unresolved.
    pub fn country_name(&self) -> Option<&'static str> {
        self.country.as_ref().map(CountryCode::name)
    }

    /// Returns `true` if the session counts as abandoned at `cutoff`:
    /// not finished, and not pinged since `cutoff`.
    pub fn is_stale(&self, cutoff: DateTime<Utc>) -> bool {
        !self.status.is_terminal() && self.last_ping_at <= cutoff
    }

    /// The representation everybody may see.
    pub fn to_public(&self) -> PublicSession {
        PublicSession {
            id: self.id,
            name: self.name.clone(),
            ip: self.address.clone(),
            country: self.country,
            version: self.version.clone(),
            status: self.status,
            created_at: self.created_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
            winner: self.winner,
        }
    }

    /// The creator's representation, token included. Only the creation
    /// path should call this.
    pub fn into_private(self) -> PrivateSession {
        let session = self.to_public();
        PrivateSession {
            session,
            token: self.token,
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("token", &"<redacted>")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("country", &self.country)
            .field("version", &self.version)
            .field("status", &self.status)
            .field("winner", &self.winner)
            .field("created_at", &self.created_at)
            .field("last_ping_at", &self.last_ping_at)
            .field("started_at", &self.started_at)
            .field("finished_at", &self.finished_at)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// NewSession
// ---------------------------------------------------------------------------

/// Everything needed to store a new session except its id, which the
/// store assigns.
#[derive(Clone)]
pub struct NewSession {
    pub token: String,
    pub name: String,
    pub address: String,
    pub country: Option<CountryCode>,
    pub version: String,
    pub created_at: DateTime<Utc>,
}

impl NewSession {
    /// Builds the stored record: `WAITING`, pinged at creation time.
    pub fn into_session(self, id: SessionId) -> Session {
        Session {
            id,
            token: self.token,
            name: self.name,
            address: self.address,
            country: self.country,
            version: self.version,
            status: GameStatus::Waiting,
            winner: None,
            created_at: self.created_at,
            last_ping_at: self.created_at,
            started_at: None,
            finished_at: None,
        }
    }
}

impl fmt::Debug for NewSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewSession")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}
