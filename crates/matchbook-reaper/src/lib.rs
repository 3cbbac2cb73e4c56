//! Stale-session sweeper for Matchbook.
//!
//! A game that stops pinging is abandoned: the host crashed, lost its
//! connection, or just closed the window. The [`Reaper`] finds every
//! unfinished game whose last ping is older than a TTL and deletes it.
//! Finished games are history and are never reaped.
//!
//! # Periodic mode
//!
//! [`Reaper::spawn`] runs a sweep every [`ReaperConfig::sweep_interval`]
//! on a background task and hands back a [`ReaperHandle`]:
//!
//! ```ignore
//! let handle = Reaper::new(store, clock, ReaperConfig::default()).spawn();
//! // ...
//! println!("last sweep: {:?}", handle.latest());
//! handle.shutdown().await;
//! ```
//!
//! Sweeps race freely with player requests. Each deletion re-checks
//! staleness atomically inside the store, so a game pinged after being
//! listed survives.

mod error;
mod task;

use std::sync::Arc;
use std::time::Duration;

use matchbook_discovery::{Discovery, stale_cutoff};
use matchbook_session::{Clock, Session, SessionError, SessionStore};
use tracing::{debug, info, warn};

pub use error::ReaperError;
pub use task::ReaperHandle;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Reaper settings.
#[derive(Debug, Clone)]
pub struct ReaperConfig {
    /// Minutes without a ping after which an unfinished game is stale.
    /// Default: 30.
    pub ttl_minutes: u32,
    /// Time between two periodic sweeps. Default: 60 s.
    pub sweep_interval: Duration,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: 30,
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl ReaperConfig {
    /// Shortest accepted TTL. A zero TTL would reap every game on sight.
    pub const MIN_TTL_MINUTES: u32 = 1;
    /// Shortest accepted pause between sweeps.
    pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

    /// Default config with a specific TTL.
    pub fn with_ttl(ttl_minutes: u32) -> Self {
        Self {
            ttl_minutes,
            ..Default::default()
        }
    }

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called by [`Reaper::new`]. Rules:
    /// - `ttl_minutes` raised to [`Self::MIN_TTL_MINUTES`].
    /// - `sweep_interval` raised to [`Self::MIN_SWEEP_INTERVAL`].
    pub fn validated(mut self) -> Self {
        if self.ttl_minutes < Self::MIN_TTL_MINUTES {
            warn!(
                ttl_minutes = self.ttl_minutes,
                min = Self::MIN_TTL_MINUTES,
                "ttl_minutes below minimum, clamping"
            );
            self.ttl_minutes = Self::MIN_TTL_MINUTES;
        }
        if self.sweep_interval < Self::MIN_SWEEP_INTERVAL {
            warn!(
                interval_ms = self.sweep_interval.as_millis() as u64,
                "sweep_interval below minimum, clamping"
            );
            self.sweep_interval = Self::MIN_SWEEP_INTERVAL;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Sweep report
// ---------------------------------------------------------------------------

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Games listed as stale.
    pub found: usize,
    /// Games actually deleted.
    pub removed: usize,
    /// Games that were deleted or pinged by someone else in the meantime.
    pub skipped: usize,
    /// Games whose deletion failed in the store.
    pub failed: usize,
}

// ---------------------------------------------------------------------------
// Reaper
// ---------------------------------------------------------------------------

/// Finds and deletes abandoned games.
pub struct Reaper<S> {
    store: Arc<S>,
    discovery: Discovery<S>,
    clock: Arc<dyn Clock>,
    config: ReaperConfig,
}

impl<S: SessionStore> Reaper<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, config: ReaperConfig) -> Self {
        let discovery = Discovery::new(Arc::clone(&store), Arc::clone(&clock));
        Self {
            store,
            discovery,
            clock,
            config: config.validated(),
        }
    }

    pub fn config(&self) -> &ReaperConfig {
        &self.config
    }

    /// Every unfinished game not pinged in the last `ttl_minutes`,
    /// oldest ping first.
    pub async fn find_stale(&self, ttl_minutes: u32) -> Result<Vec<Session>, ReaperError> {
        Ok(self.discovery.stale(ttl_minutes).await?)
    }

    /// Deletes every stale game and reports what happened.
    ///
    /// Only failing to list the stale games aborts the sweep. A game that
    /// vanished or was pinged since being listed is skipped; a failed
    /// deletion is logged and the sweep moves on.
    pub async fn sweep(&self, ttl_minutes: u32) -> Result<SweepReport, ReaperError> {
        let cutoff = stale_cutoff(self.clock.now(), ttl_minutes);
        let stale = self.discovery.stale_at(cutoff).await?;
        let mut report = SweepReport {
            found: stale.len(),
            ..Default::default()
        };

        for session in stale {
            let id = session.id;
            // The listing is already out of date by now. Judge staleness
            // again on the record `remove_if` holds under its lock, so a
            // ping that landed since is never reaped.
            let outcome = self
                .store
                .remove_if(id, move |current| {
                    if current.is_stale(cutoff) {
                        Ok(())
                    } else {
                        Err(SessionError::StillActive(id))
                    }
                })
                .await;

            match outcome {
                Ok(removed) => {
                    report.removed += 1;
                    debug!(
                        session_id = %id,
                        last_ping_at = %removed.last_ping_at,
                        "reaped stale game"
                    );
                }
                Err(SessionError::NotFound(_) | SessionError::StillActive(_)) => {
                    report.skipped += 1;
                    debug!(session_id = %id, "stale game changed before reaping, skipped");
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(session_id = %id, error = %e, "failed to reap stale game");
                }
            }
        }

        info!(
            removed = report.removed,
            found = report.found,
            skipped = report.skipped,
            failed = report.failed,
            ttl_minutes,
            "stale sweep complete"
        );
        Ok(report)
    }

    /// Sweeps with the configured TTL.
    pub async fn sweep_now(&self) -> Result<SweepReport, ReaperError> {
        self.sweep(self.config.ttl_minutes).await
    }

    /// Moves the reaper onto a background task sweeping every
    /// `sweep_interval`. Must be called within a Tokio runtime.
    pub fn spawn(self) -> ReaperHandle {
        task::spawn(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_values() {
        let config = ReaperConfig::default();
        assert_eq!(config.ttl_minutes, 30);
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_config_with_ttl_keeps_interval() {
        let config = ReaperConfig::with_ttl(5);
        assert_eq!(config.ttl_minutes, 5);
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_validated_zero_ttl_clamped() {
        let config = ReaperConfig::with_ttl(0).validated();
        assert_eq!(config.ttl_minutes, ReaperConfig::MIN_TTL_MINUTES);
    }

    #[test]
    fn test_validated_short_interval_clamped() {
        let config = ReaperConfig {
            sweep_interval: Duration::from_millis(10),
            ..Default::default()
        }
        .validated();
        assert_eq!(config.sweep_interval, ReaperConfig::MIN_SWEEP_INTERVAL);
    }

    #[test]
    fn test_validated_in_range_unchanged() {
        let config = ReaperConfig {
            ttl_minutes: 90,
            sweep_interval: Duration::from_secs(300),
        }
        .validated();
        assert_eq!(config.ttl_minutes, 90);
        assert_eq!(config.sweep_interval, Duration::from_secs(300));
    }
}
