//! Error types for the protocol layer.
//!
//! Each crate in Matchbook defines its own error enum. When you see a
//! `ProtocolError`, the problem is in parsing or serialization, not in
//! the lifecycle rules or the store.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, wrong data types, or an enum
    /// value outside the allowed set.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A string is not one of the ISO 3166-1 alpha-2 country codes.
    #[error("invalid parameter: {0:?} is not a valid ISO 3166-1 alpha-2 country code")]
    InvalidCountry(String),

    /// A string does not name one of the allowed enum values.
    ///
    /// `allowed` lists the accepted spellings, comma separated.
    #[error("invalid parameter: {value:?}, it can be one of: {allowed}")]
    InvalidValue { value: String, allowed: String },
}
