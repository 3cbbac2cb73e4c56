//! # Matchbook
//!
//! A directory for online matches. Hosts advertise a game, keep it alive
//! with pings, move it from `WAITING` to `PLAYING` to `FINISHED`, and
//! clients browse the open ones. Games that stop pinging are reaped.
//!
//! The facade is [`Directory`]; a request layer decodes a wire request,
//! works out the caller's address, calls one method, and encodes the
//! result (or maps the error with [`MatchbookError::http_status`]).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use matchbook::prelude::*;
//!
//! # async fn run() -> Result<(), MatchbookError> {
//! matchbook::init_tracing();
//! let directory = DirectoryBuilder::new().build(Arc::new(MemoryStore::new()), NullResolver);
//!
//! let caller = client_address(Some("203.0.113.7, 10.0.0.1"), "10.0.0.1");
//! let created = directory
//!     .create(CreateSession { name: "Friday night".into(), version: "1.4".into() }, &caller)
//!     .await?;
//! println!("share this token with nobody: {}", created.token);
//!
//! let reaper = directory.spawn_reaper();
//! // ... serve requests ...
//! reaper.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod directory;
mod error;

pub use directory::{Directory, DirectoryBuilder};
pub use error::MatchbookError;

pub use matchbook_discovery as discovery;
pub use matchbook_protocol as protocol;
pub use matchbook_reaper as reaper;
pub use matchbook_session as session;

/// Installs a `tracing` subscriber filtered by `RUST_LOG`, `info` by
/// default.
///
/// Does nothing if a global subscriber is already set.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Everything needed to embed the directory.
pub mod prelude {
    pub use crate::{Directory, DirectoryBuilder, MatchbookError};

    pub use matchbook_protocol::{
        Codec, CountryCode, CreateSession, DeleteSession, DirectoryQuery, GameStatus,
        HomeQuery, PrivateSession, ProtocolError, PublicSession, SessionId, UpdateSession,
        Winner, client_address,
    };

    pub use matchbook_protocol::JsonCodec;

    pub use matchbook_session::{
        Clock, LifecycleConfig, LocationResolver, ManualClock, MemoryStore, NullResolver,
        SessionError, SessionStore, StaticResolver, StoreError, SystemClock,
    };

    pub use matchbook_reaper::{ReaperConfig, ReaperError, ReaperHandle, SweepReport};
}
