//! A lobby evening in fast-forward.
//!
//! Two hosts advertise games, one of them plays to the end, the other
//! forgets about its lobby and gets reaped. The directory runs on a
//! simulated clock so an hour of silence takes no time at all.
//!
//! ```text
//! RUST_LOG=debug MATCHBOOK_TTL_MINUTES=15 cargo run -p lobby
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as Minutes, Utc};
use matchbook::prelude::*;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "ignoring unparseable setting");
            default
        }),
        Err(_) => default,
    }
}

fn reaper_config() -> ReaperConfig {
    let defaults = ReaperConfig::default();
    ReaperConfig {
        ttl_minutes: env_or("MATCHBOOK_TTL_MINUTES", defaults.ttl_minutes),
        sweep_interval: Duration::from_secs(env_or(
            "MATCHBOOK_SWEEP_SECS",
            defaults.sweep_interval.as_secs(),
        )),
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

const DUBLIN: &str = "203.0.113.5";
const LISBON: &str = "198.51.100.9";
const PROXY: &str = "10.0.0.2";

#[tokio::main]
async fn main() -> Result<(), MatchbookError> {
    matchbook::init_tracing();

    let clock = Arc::new(ManualClock::new(Utc::now()));
    let resolver = StaticResolver::new()
        .with(DUBLIN, CountryCode::parse("IE")?)
        .with(LISBON, CountryCode::parse("PT")?);
    let directory = DirectoryBuilder::new()
        .clock(clock.clone())
        .reaper_config(reaper_config())
        .build(Arc::new(MemoryStore::new()), resolver);
    let codec = JsonCodec;

    // Both hosts sit behind the same proxy.
    let dublin = client_address(Some(DUBLIN), PROXY);
    let lisbon = client_address(Some(&format!("{LISBON}, {PROXY}")), PROXY);

    let req: CreateSession = codec.decode(br#"{"name":"Dublin derby","version":"1.4"}"#)?;
    let derby = directory.create(req, &dublin).await?;
    let req: CreateSession = codec.decode(br#"{"name":"Lisbon late night","version":"1.4"}"#)?;
    let late_night = directory.create(req, &lisbon).await?;
    println!("created: {}", String::from_utf8_lossy(&codec.encode(&derby)?));

    let open = directory.directory(&DirectoryQuery::new("1.4")).await?;
    println!("open games: {}", String::from_utf8_lossy(&codec.encode(&open)?));

    clock.advance(Minutes::minutes(3));
    let start = UpdateSession {
        token: derby.token.clone(),
        status: Some(GameStatus::Playing),
        ..Default::default()
    };
    directory.update(derby.session.id, start, &dublin).await?;

    clock.advance(Minutes::minutes(12));
    let finish = UpdateSession {
        token: derby.token.clone(),
        status: Some(GameStatus::Finished),
        winner: Some(Winner::Red),
        ..Default::default()
    };
    let result = directory.update(derby.session.id, finish, &dublin).await?;
    println!("final: {}", String::from_utf8_lossy(&codec.encode(&result)?));

    // Finished games are history: not even the host can delete them.
    let rejected = directory
        .delete(derby.session.id, DeleteSession { token: derby.token })
        .await;
    if let Err(e) = rejected {
        println!("delete after finish: {} ({e})", e.http_status());
    }

    // The Lisbon host never comes back.
    clock.advance(Minutes::hours(1));
    let report = directory.sweep().await?;
    println!(
        "sweep: {} stale, {} removed (game {} gone)",
        report.found, report.removed, late_night.session.id
    );

    let everything = directory
        .home(&HomeQuery {
            statuses: GameStatus::ALL.to_vec(),
            ..Default::default()
        })
        .await?;
    println!("remaining: {}", String::from_utf8_lossy(&codec.encode(&everything)?));

    let reaper = directory.spawn_reaper();
    tokio::time::sleep(Duration::from_millis(50)).await;
    tracing::info!(last = ?reaper.latest(), "stopping background reaper");
    reaper.shutdown().await;

    Ok(())
}
