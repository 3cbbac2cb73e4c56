//! Request payloads and response views at the directory boundary.
//!
//! Requests carry only what the client sends; the caller's address is
//! always taken from the connection (see [`client_address`](crate::client_address)),
//! never from the body.
//!
//! Responses come in two shapes. [`PublicSession`] is what everybody
//! sees. [`PrivateSession`] adds the ownership token and is returned
//! exactly once, to the creator, in the creation response.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CountryCode, GameStatus, SessionId, Winner};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Body of a creation request.
///
/// Missing fields decode as empty strings so that the lifecycle layer
/// reports them as a validation failure with a useful message rather
/// than a generic decode error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSession {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// Body of an update request. Everything except `token` is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSession {
    #[serde(default)]
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<GameStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Winner>,
}

/// Body of a delete request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteSession {
    #[serde(default)]
    pub token: String,
}

/// Filters for the human-facing listing.
///
/// An empty `statuses` list means "waiting games only".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeQuery {
    #[serde(default)]
    pub statuses: Vec<GameStatus>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub country: Option<CountryCode>,
}

impl HomeQuery {
    /// The statuses to match, with the `{WAITING}` default applied.
    pub fn effective_statuses(&self) -> Vec<GameStatus> {
        if self.statuses.is_empty() {
            vec![GameStatus::Waiting]
        } else {
            self.statuses.clone()
        }
    }
}

/// Filters for the programmatic directory.
///
/// `version` is mandatory: clients only ever discover games they can
/// actually join. Only waiting games are listed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryQuery {
    pub version: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub country: Option<CountryCode>,
}

impl DirectoryQuery {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// The public representation of a game session. Never carries the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicSession {
    pub id: SessionId,
    pub name: String,
    pub ip: String,
    pub country: Option<CountryCode>,
    pub version: String,
    pub status: GameStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub winner: Option<Winner>,
}

/// The creator's view: the public fields plus the ownership token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateSession {
    #[serde(flatten)]
    pub session: PublicSession,
    pub token: String,
}

// =========================================================================
// Tests
// =========================================================================
