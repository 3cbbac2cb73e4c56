//! Unified error type for the Matchbook directory.

use matchbook_protocol::ProtocolError;
use matchbook_reaper::ReaperError;
use matchbook_session::{SessionError, StoreError};

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attributes let `?` convert sub-crate errors, so callers
/// of the `matchbook` facade only ever match on this one type.
#[derive(Debug, thiserror::Error)]
pub enum MatchbookError {
    /// A request could not be decoded, or a parameter is malformed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A lifecycle rule rejected the request, or the store failed under it.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A listing query failed in the store.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A sweep could not run.
    #[error(transparent)]
    Reaper(#[from] ReaperError),
}

impl MatchbookError {
    /// The HTTP status a request layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Protocol(_) => 400,
            Self::Session(e) => e.http_status(),
            Self::Store(StoreError::Conflict { .. }) => 409,
            Self::Store(_) | Self::Reaper(_) => 500,
        }
    }
}
