//! Integration tests for sweeping stale games, one-shot and periodic.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, TimeZone, Utc};
use matchbook_protocol::{GameStatus, SessionId, Winner};
use matchbook_reaper::{Reaper, ReaperConfig, SweepReport};
use matchbook_session::{
    ManualClock, MemoryStore, NewSession, Session, SessionError, SessionFilter, SessionStore,
    StoreError,
};

// =========================================================================
// Helpers
// =========================================================================

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 2, 14, 23, 45, 0).unwrap()
}

/// A waiting session pinged `idle` minutes before `now()`.
fn session(id: u64, idle: i64) -> Session {
    let pinged = now() - Duration::minutes(idle);
    let mut s = NewSession {
        token: format!("secret-{id}"),
        name: format!("game {id}"),
        address: format!("198.51.100.{id}"),
        country: None,
        version: "2.1".into(),
        created_at: pinged,
    }
    .into_session(SessionId(id));
    s.last_ping_at = pinged;
    s
}

fn with_status(mut s: Session, status: GameStatus) -> Session {
    s.status = status;
    if status != GameStatus::Waiting {
        s.started_at = Some(s.last_ping_at);
    }
    if status == GameStatus::Finished {
        s.finished_at = Some(s.last_ping_at);
        s.winner = Some(Winner::Yellow);
    }
    s
}

fn reaper<S: SessionStore>(store: Arc<S>) -> Reaper<S> {
    Reaper::new(
        store,
        Arc::new(ManualClock::new(now())),
        ReaperConfig::default(),
    )
}

/// What [`InterferingStore`] does to a session right before the reaper
/// tries to remove it.
#[derive(Clone, Copy)]
enum Interference {
    /// The backend fails the removal.
    Fail(SessionId),
    /// The host pings the game just in time.
    Ping(SessionId),
    /// The host deletes the game itself.
    Delete(SessionId),
}

/// Wraps a [`MemoryStore`] and simulates another actor touching one
/// session between the stale listing and its removal.
struct InterferingStore {
    inner: MemoryStore,
    interference: Interference,
}

impl SessionStore for InterferingStore {
    async fn insert(&self, new: NewSession) -> Result<Session, StoreError> {
        self.inner.insert(new).await
    }

    async fn get(&self, id: SessionId) -> Result<Option<Session>, StoreError> {
        self.inner.get(id).await
    }

    async fn modify<F>(&self, id: SessionId, apply: F) -> Result<Session, SessionError>
    where
        F: FnOnce(&mut Session) -> Result<(), SessionError> + Send,
    {
        self.inner.modify(id, apply).await
    }

    async fn remove_if<F>(&self, id: SessionId, check: F) -> Result<Session, SessionError>
    where
        F: FnOnce(&Session) -> Result<(), SessionError> + Send,
    {
        match self.interference {
            Interference::Fail(target) if target == id => {
                return Err(SessionError::Store(StoreError::Unavailable(
                    "connection reset".into(),
                )));
            }
            Interference::Ping(target) if target == id => {
                self.inner
                    .modify(id, |s| {
                        s.last_ping_at = now();
                        Ok(())
                    })
                    .await?;
            }
            Interference::Delete(target) if target == id => {
                self.inner.remove_if(id, |_| Ok(())).await?;
            }
            _ => {}
        }
        self.inner.remove_if(id, check).await
    }

    async fn query(&self, filter: &SessionFilter) -> Result<Vec<Session>, StoreError> {
        self.inner.query(filter).await
    }
}

async fn interfering(sessions: Vec<Session>, interference: Interference) -> Arc<InterferingStore> {
    let store = InterferingStore {
        inner: MemoryStore::new(),
        interference,
    };
    for s in sessions {
        store.inner.restore(s).await.unwrap();
    }
    Arc::new(store)
}

async fn memory(sessions: Vec<Session>) -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    for s in sessions {
        store.restore(s).await.unwrap();
    }
    Arc::new(store)
}

// =========================================================================
// One-shot sweeps
// =========================================================================

#[tokio::test]
async fn test_find_stale_lists_unfinished_past_ttl() {
    let store = memory(vec![
        session(1, 40),
        with_status(session(2, 40), GameStatus::Finished),
        with_status(session(3, 10), GameStatus::Playing),
        with_status(session(4, 35), GameStatus::Playing),
    ])
    .await;

    let stale = reaper(store).find_stale(30).await.unwrap();

    let ids: Vec<u64> = stale.iter().map(|s| s.id.0).collect();
    assert_eq!(ids, vec![1, 4]);
}

#[tokio::test]
async fn test_sweep_removes_stale_and_keeps_the_rest() {
    let store = memory(vec![
        session(1, 40),
        with_status(session(2, 40), GameStatus::Finished),
        with_status(session(3, 10), GameStatus::Playing),
        with_status(session(4, 35), GameStatus::Playing),
    ])
    .await;

    let report = reaper(Arc::clone(&store)).sweep(30).await.unwrap();

    assert_eq!(
        report,
        SweepReport {
            found: 2,
            removed: 2,
            skipped: 0,
            failed: 0,
        }
    );
    assert!(store.get(SessionId(1)).await.unwrap().is_none());
    assert!(store.get(SessionId(4)).await.unwrap().is_none());
    assert!(store.get(SessionId(2)).await.unwrap().is_some());
    assert!(store.get(SessionId(3)).await.unwrap().is_some());
}

#[tokio::test]
async fn test_sweep_nothing_stale_reports_zero() {
    let store = memory(vec![session(1, 5), session(2, 29)]).await;

    let report = reaper(Arc::clone(&store)).sweep(30).await.unwrap();

    assert_eq!(report, SweepReport::default());
    assert_eq!(store.len().await, 2);
}

#[tokio::test]
async fn test_sweep_now_uses_configured_ttl() {
    let store = memory(vec![session(1, 8), session(2, 3)]).await;
    let reaper = Reaper::new(
        Arc::clone(&store),
        Arc::new(ManualClock::new(now())),
        ReaperConfig::with_ttl(5),
    );

    let report = reaper.sweep_now().await.unwrap();

    assert_eq!(report.removed, 1);
    assert!(store.get(SessionId(2)).await.unwrap().is_some());
}

#[tokio::test]
async fn test_sweep_store_failure_continues_with_next() {
    let store = interfering(
        vec![session(1, 50), session(2, 45), session(3, 40)],
        Interference::Fail(SessionId(2)),
    )
    .await;

    let report = reaper(Arc::clone(&store)).sweep(30).await.unwrap();

    assert_eq!(report.found, 3);
    assert_eq!(report.removed, 2);
    assert_eq!(report.failed, 1);
    assert!(store.get(SessionId(2)).await.unwrap().is_some());
    assert!(store.get(SessionId(3)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_sweep_game_pinged_meanwhile_survives() {
    let store = interfering(
        vec![session(1, 50), session(2, 45)],
        Interference::Ping(SessionId(1)),
    )
    .await;

    let report = reaper(Arc::clone(&store)).sweep(30).await.unwrap();

    assert_eq!(report.removed, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed, 0);
    let survivor = store.get(SessionId(1)).await.unwrap().unwrap();
    assert_eq!(survivor.last_ping_at, now());
}

#[tokio::test]
async fn test_sweep_game_deleted_meanwhile_is_not_counted() {
    let store = interfering(
        vec![session(1, 50), session(2, 45)],
        Interference::Delete(SessionId(2)),
    )
    .await;

    let report = reaper(Arc::clone(&store)).sweep(30).await.unwrap();

    assert_eq!(report.removed, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed, 0);
    assert!(store.inner.is_empty().await);
}

// =========================================================================
// Periodic mode
// =========================================================================

#[tokio::test]
async fn test_spawn_sweeps_after_each_interval() {
    tokio::time::pause();
    let store = memory(vec![session(1, 45)]).await;
    let handle = reaper(Arc::clone(&store)).spawn();
    let mut reports = handle.reports();

    // Nothing happens before the first full interval.
    tokio::time::sleep(StdDuration::from_secs(59)).await;
    assert_eq!(store.len().await, 1);
    assert_eq!(handle.latest(), SweepReport::default());

    reports.changed().await.unwrap();
    assert_eq!(reports.borrow().removed, 1);
    assert!(store.is_empty().await);

    // The next sweep runs one interval later and finds nothing.
    store.restore(session(2, 5)).await.unwrap();
    reports.changed().await.unwrap();
    assert_eq!(*reports.borrow(), SweepReport::default());
    assert_eq!(store.len().await, 1);

    handle.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_stops_sweeping() {
    tokio::time::pause();
    let store = memory(Vec::new()).await;
    let handle = reaper(Arc::clone(&store)).spawn();

    handle.shutdown().await;
    store.restore(session(7, 90)).await.unwrap();
    tokio::time::sleep(StdDuration::from_secs(600)).await;

    assert_eq!(store.len().await, 1);
}
