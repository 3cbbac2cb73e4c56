//! Error types for the reaper.

use matchbook_session::StoreError;

/// Errors that abort a whole sweep.
///
/// A failure removing one session does not end up here: it is logged and
/// counted in [`SweepReport::failed`](crate::SweepReport::failed).
#[derive(Debug, thiserror::Error)]
pub enum ReaperError {
    /// The stale listing itself could not be read.
    #[error("could not list stale games: {0}")]
    Store(#[from] StoreError),
}
