//! Game-session management for Matchbook.
//!
//! This crate owns everything about a single advertised game:
//!
//! 1. **The entity**: [`Session`], its fields and derived labels
//! 2. **Ownership**: a random token handed to the creator, required for
//!    every later mutation
//! 3. **The lifecycle**: [`Lifecycle`] validates and applies status
//!    transitions (`WAITING → PLAYING → FINISHED`)
//! 4. **Capabilities**: the [`SessionStore`] and [`LocationResolver`]
//!    traits the lifecycle is written against, plus an in-memory store
//!    and simple resolvers
//!
//! # How it fits in the stack
//!
//! ```text
//! Discovery / Reaper (above)  ← read and reap sessions through the store
//!     ↕
//! Session Layer (this crate)  ← entity, lifecycle rules, store contract
//!     ↕
//! Protocol Layer (below)      ← SessionId, GameStatus, wire views
//! ```

#![allow(async_fn_in_trait)]

mod clock;
mod error;
mod lifecycle;
mod locate;
mod session;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{SessionError, StoreError};
pub use lifecycle::{Lifecycle, LifecycleConfig, SessionPatch};
#[cfg(feature = "geoip")]
pub use locate::GeoIpResolver;
pub use locate::{LocationResolver, NullResolver, StaticResolver};
pub use session::{NewSession, Session};
pub use store::{MemoryStore, SessionFilter, SessionStore, sort_for_discovery};
