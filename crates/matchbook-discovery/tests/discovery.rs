//! Integration tests for the discovery listings over the in-memory store.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use matchbook_discovery::Discovery;
use matchbook_protocol::{CountryCode, DirectoryQuery, GameStatus, HomeQuery, SessionId, Winner};
use matchbook_session::{ManualClock, MemoryStore, NewSession, Session};

// =========================================================================
// Helpers
// =========================================================================

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 11, 5, 21, 0, 0).unwrap()
}

fn code(c: &str) -> CountryCode {
    CountryCode::parse(c).unwrap()
}

/// A waiting session pinged `idle` minutes before `now()`.
fn session(id: u64, name: &str, idle: i64) -> Session {
    let pinged = now() - Duration::minutes(idle);
    let mut s = NewSession {
        token: format!("tok{id}"),
        name: name.into(),
        address: format!("192.0.2.{id}"),
        country: None,
        version: "1.0".into(),
        created_at: pinged,
    }
    .into_session(SessionId(id));
    s.last_ping_at = pinged;
    s
}

fn playing(mut s: Session) -> Session {
    s.status = GameStatus::Playing;
    s.started_at = Some(s.last_ping_at);
    s
}

fn finished(mut s: Session) -> Session {
    s.status = GameStatus::Finished;
    s.started_at = Some(s.last_ping_at);
    s.finished_at = Some(s.last_ping_at);
    s.winner = Some(Winner::Red);
    s
}

async fn discovery_with(sessions: Vec<Session>) -> Discovery<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for s in sessions {
        store.restore(s).await.unwrap();
    }
    Discovery::new(store, Arc::new(ManualClock::new(now())))
}

fn ids(sessions: &[Session]) -> Vec<u64> {
    sessions.iter().map(|s| s.id.0).collect()
}

// =========================================================================
// Ordering
// =========================================================================

#[tokio::test]
async fn test_home_orders_by_last_ping_then_name() {
    // A(t1,"b"), B(t1,"a"), C(t2 > t1) → [B, A, C]
    let a = session(1, "b", 10);
    let b = session(2, "a", 10);
    let c = session(3, "0-first-by-name-but-newer", 5);
    let discovery = discovery_with(vec![c, a, b]).await;

    let listed = discovery.home(&HomeQuery::default()).await.unwrap();

    assert_eq!(ids(&listed), vec![2, 1, 3]);
}

#[tokio::test]
async fn test_directory_orders_oldest_idle_first() {
    let discovery = discovery_with(vec![
        session(1, "fresh", 1),
        session(2, "patient", 25),
        session(3, "middle", 12),
    ])
    .await;

    let listed = discovery.directory(&DirectoryQuery::new("1.0")).await.unwrap();

    assert_eq!(ids(&listed), vec![2, 3, 1]);
}

// =========================================================================
// Home listing filters
// =========================================================================

#[tokio::test]
async fn test_home_defaults_to_waiting_only() {
    let discovery = discovery_with(vec![
        session(1, "waiting", 3),
        playing(session(2, "playing", 3)),
        finished(session(3, "finished", 3)),
    ])
    .await;

    let listed = discovery.home(&HomeQuery::default()).await.unwrap();

    assert_eq!(ids(&listed), vec![1]);
}

#[tokio::test]
async fn test_home_status_set_filter() {
    let discovery = discovery_with(vec![
        session(1, "waiting", 3),
        playing(session(2, "playing", 2)),
        finished(session(3, "finished", 1)),
    ])
    .await;
    let query = HomeQuery {
        statuses: vec![GameStatus::Playing, GameStatus::Finished],
        ..HomeQuery::default()
    };

    let listed = discovery.home(&query).await.unwrap();

    assert_eq!(ids(&listed), vec![2, 3]);
}

#[tokio::test]
async fn test_home_ignores_version() {
    let mut other = session(2, "other version", 1);
    other.version = "0.9".into();
    let discovery = discovery_with(vec![session(1, "current", 2), other]).await;

    let listed = discovery.home(&HomeQuery::default()).await.unwrap();

    assert_eq!(ids(&listed), vec![1, 2]);
}

#[tokio::test]
async fn test_home_name_and_country_filters() {
    let mut fr = session(1, "Paris Open", 3);
    fr.country = Some(code("FR"));
    let mut fr_other = session(2, "Lyon Cup", 2);
    fr_other.country = Some(code("FR"));
    let mut de = session(3, "Berlin Open", 1);
    de.country = Some(code("DE"));
    let unresolved = session(4, "Somewhere Open", 1);
    let discovery = discovery_with(vec![fr, fr_other, de, unresolved]).await;

    let by_name = discovery
        .home(&HomeQuery {
            name: Some("OPEN".into()),
            ..HomeQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(ids(&by_name), vec![1, 3, 4]);

    let by_both = discovery
        .home(&HomeQuery {
            name: Some("open".into()),
            country: Some(code("FR")),
            ..HomeQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(ids(&by_both), vec![1]);
}

// =========================================================================
// Directory listing filters
// =========================================================================

#[tokio::test]
async fn test_directory_excludes_other_versions() {
    let mut old = session(2, "old client", 5);
    old.version = "0.9".into();
    let discovery = discovery_with(vec![session(1, "new client", 4), old]).await;

    let listed = discovery.directory(&DirectoryQuery::new("1.0")).await.unwrap();
    assert_eq!(ids(&listed), vec![1]);

    let listed = discovery.directory(&DirectoryQuery::new("0.9")).await.unwrap();
    assert_eq!(ids(&listed), vec![2]);
}

#[tokio::test]
async fn test_directory_lists_only_waiting() {
    let discovery = discovery_with(vec![
        session(1, "open seat", 3),
        playing(session(2, "busy", 3)),
        finished(session(3, "over", 3)),
    ])
    .await;

    let listed = discovery.directory(&DirectoryQuery::new("1.0")).await.unwrap();

    assert_eq!(ids(&listed), vec![1]);
}

#[tokio::test]
async fn test_directory_country_and_name_filters() {
    let mut jp = session(1, "Tokyo night", 3);
    jp.country = Some(code("JP"));
    let mut jp2 = session(2, "Osaka day", 2);
    jp2.country = Some(code("JP"));
    let discovery = discovery_with(vec![jp, jp2, session(3, "night owl", 1)]).await;

    let query = DirectoryQuery {
        version: "1.0".into(),
        name: Some("night".into()),
        country: Some(code("JP")),
    };
    let listed = discovery.directory(&query).await.unwrap();

    assert_eq!(ids(&listed), vec![1]);
}

#[tokio::test]
async fn test_directory_empty_store_returns_empty() {
    let discovery = discovery_with(vec![]).await;
    let listed = discovery.directory(&DirectoryQuery::new("1.0")).await.unwrap();
    assert!(listed.is_empty());
}

// =========================================================================
// Staleness
// =========================================================================

#[tokio::test]
async fn test_stale_applies_ttl_and_skips_finished() {
    let discovery = discovery_with(vec![
        session(1, "abandoned lobby", 40),
        finished(session(2, "long over", 40)),
        playing(session(3, "in progress", 10)),
        playing(session(4, "stuck game", 31)),
    ])
    .await;

    let stale = discovery.stale(30).await.unwrap();

    // Oldest ping first: the 40 minute lobby, then the 31 minute game.
    assert_eq!(ids(&stale), vec![1, 4]);
}

#[tokio::test]
async fn test_stale_cutoff_is_inclusive() {
    let discovery = discovery_with(vec![session(1, "exactly at ttl", 30), session(2, "just inside", 29)]).await;

    let stale = discovery.stale(30).await.unwrap();

    assert_eq!(ids(&stale), vec![1]);
}

#[tokio::test]
async fn test_stale_with_zero_ttl_returns_all_unfinished() {
    let discovery = discovery_with(vec![
        session(1, "waiting", 0),
        playing(session(2, "playing", 0)),
        finished(session(3, "finished", 0)),
    ])
    .await;

    let stale = discovery.stale(0).await.unwrap();

    assert_eq!(ids(&stale), vec![1, 2]);
}
