//! Wire protocol for Matchbook.
//!
//! This crate defines the "language" spoken at the directory's boundary:
//!
//! - **Types** ([`SessionId`], [`GameStatus`], [`Winner`],
//!   [`CountryCode`]): the closed vocabulary every other layer builds on.
//! - **Requests and views** ([`CreateSession`], [`UpdateSession`],
//!   [`PublicSession`], [`PrivateSession`], ...): what a request layer
//!   decodes from clients and encodes back to them.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those messages
//!   are converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong while parsing
//!   or encoding.
//!
//! # Architecture
//!
//! The protocol layer knows nothing about storage or lifecycle rules.
//! It only knows how values look on the wire.
//!
//! ```text
//! Request layer (bytes) → Protocol (typed requests) → Session (lifecycle)
//! ```

mod codec;
mod error;
mod types;
mod wire;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{CountryCode, GameStatus, SessionId, Winner, client_address};
pub use wire::{
    CreateSession, DeleteSession, DirectoryQuery, HomeQuery, PrivateSession,
    PublicSession, UpdateSession,
};
