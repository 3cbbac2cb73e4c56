//! The periodic sweep task.

use matchbook_session::SessionStore;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error};

use crate::{Reaper, SweepReport};

/// Control handle for a reaper running in the background.
///
/// Dropping the handle also stops the task, after any sweep in progress.
pub struct ReaperHandle {
    /// Taken by `shutdown`; otherwise dropped with the handle, which the
    /// task sees as a shutdown too.
    shutdown: Option<oneshot::Sender<()>>,
    /// Holds the latest report only. Slow readers skip intermediate ones.
    reports: watch::Receiver<SweepReport>,
    task: JoinHandle<()>,
}

impl ReaperHandle {
    /// The report of the most recent sweep (all zeros before the first).
    pub fn latest(&self) -> SweepReport {
        *self.reports.borrow()
    }

    /// A receiver notified after every completed sweep.
    pub fn reports(&self) -> watch::Receiver<SweepReport> {
        self.reports.clone()
    }

    /// Stops the task and waits for it to exit.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            // Err means the task already exited; the join below still
            // reports how.
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.task).await {
            error!(error = %e, "reaper task ended abnormally");
        }
    }
}

/// Moves `reaper` onto its own task, sweeping every
/// `config.sweep_interval` until the handle is shut down or dropped.
///
/// A failed sweep is logged and leaves the last report in place; the
/// next tick tries again.
pub(crate) fn spawn<S: SessionStore>(reaper: Reaper<S>) -> ReaperHandle {
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
    let (report_tx, report_rx) = watch::channel(SweepReport::default());
    let period = reaper.config.sweep_interval;

    let task = tokio::spawn(async move {
        // First sweep one full period after start, not immediately.
        let mut ticker = time::interval_at(Instant::now() + period, period);
        // A sweep that overruns its period shouldn't be followed by a
        // burst of catch-up sweeps.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        debug!(
            ttl_minutes = reaper.config.ttl_minutes,
            interval_secs = period.as_secs_f64(),
            "reaper started"
        );

        loop {
            tokio::select! {
                // Fires on an explicit shutdown and when the handle is
                // dropped (the sender goes with it).
                _ = &mut shutdown_rx => break,
                _ = ticker.tick() => {
                    match reaper.sweep_now().await {
                        Ok(report) => {
                            // `send_replace` stores the report even with no
                            // receiver left, unlike `send`.
                            report_tx.send_replace(report);
                        }
                        Err(e) => error!(error = %e, "stale sweep aborted"),
                    }
                }
            }
        }

        debug!("reaper stopped");
    });

    ReaperHandle {
        shutdown: Some(shutdown_tx),
        reports: report_rx,
        task,
    }
}
