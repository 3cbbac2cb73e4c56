//! Error types for the session layer.

use matchbook_protocol::{GameStatus, SessionId};

/// Errors reported by a [`SessionStore`](crate::SessionStore) backend.
///
/// These are infrastructure failures except for [`StoreError::Conflict`],
/// which is the store enforcing the one-game-per-address rule.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Another session already advertises this address.
    #[error("address {address} is already used by another game")]
    Conflict { address: String },

    /// The backend could not be reached or refused the commit.
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

/// Errors that can occur while creating, updating, or deleting a session.
///
/// Everything except [`SessionError::Store`] is detected before the store
/// commits anything, so the stored session is unchanged when one of them
/// is returned.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Required input is missing or malformed.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The caller's address already has an active game.
    #[error("address {0} already has an active game")]
    Conflict(String),

    /// No session exists with this id (never did, was deleted, or was reaped).
    #[error("game {0} does not exist")]
    NotFound(SessionId),

    /// The supplied token doesn't match the one issued at creation.
    #[error("you are not allowed to perform this operation")]
    Unauthorized,

    /// The game is `FINISHED` and accepts no further changes.
    ///
    /// `action` is the past participle of the attempted operation
    /// ("updated", "deleted").
    #[error("game {id} can no longer be {action}")]
    TerminalState { id: SessionId, action: &'static str },

    /// The requested status is the one the game already has.
    #[error("game {id} already has the {status} status")]
    RedundantTransition { id: SessionId, status: GameStatus },

    /// The game was pinged or finished between being found stale and
    /// being reaped. Only the reaper sees this.
    #[error("game {0} is no longer stale")]
    StillActive(SessionId),

    /// The game's address changed between the lifecycle reading it and
    /// the store committing the update. The lifecycle retries once with a
    /// fresh location lookup, so callers don't normally see this.
    #[error("game {0} moved while being updated")]
    MovedMeanwhile(SessionId),

    /// The store failed. Surfaced as a server-side error.
    #[error(transparent)]
    Store(StoreError),
}

impl SessionError {
    /// The HTTP status a request layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::RedundantTransition { .. } => 400,
            Self::Unauthorized | Self::TerminalState { .. } => 403,
            Self::NotFound(_) => 404,
            Self::Conflict(_) | Self::StillActive(_) | Self::MovedMeanwhile(_) => 409,
            Self::Store(_) => 500,
        }
    }

    /// Returns `true` for failures caused by the request rather than by
    /// the infrastructure.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Store(_))
    }
}

/// Address conflicts become their own kind; anything else is
/// infrastructure.
impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { address } => Self::Conflict(address),
            other => Self::Store(other),
        }
    }
}
