//! Codec trait and implementations for serializing/deserializing messages.
//!
//! The directory doesn't care HOW requests and views are serialized. The
//! request layer picks something that implements [`Codec`] and uses it on
//! both sides of a call.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` so one codec can be shared by every request
/// handler task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or
    /// don't match the expected type (unknown status, invalid country
    /// code, missing `version` on a directory query, ...).
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// This is behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use matchbook_protocol::{Codec, GameStatus, JsonCodec, UpdateSession};
///
/// let codec = JsonCodec;
/// let req: UpdateSession = codec
///     .decode(br#"{"token":"abc","status":"PLAYING"}"#)
///     .unwrap();
/// assert_eq!(req.status, Some(GameStatus::Playing));
///
/// let bytes = codec.encode(&req).unwrap();
/// let back: UpdateSession = codec.decode(&bytes).unwrap();
/// assert_eq!(req, back);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{DeleteSession, DirectoryQuery, HomeQuery};

    #[test]
    fn test_decode_malformed_json_returns_decode_error() {
        let result: Result<DeleteSession, _> = JsonCodec.decode(b"{not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_invalid_country_returns_decode_error() {
        let result: Result<DirectoryQuery, _> =
            JsonCodec.decode(br#"{"version":"1","country":"QQ"}"#);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("ISO 3166-1"), "got: {err}");
    }

    #[test]
    fn test_decode_home_query_status_list() {
        let query: HomeQuery = JsonCodec
            .decode(br#"{"statuses":["PLAYING","FINISHED"],"name":"cup"}"#)
            .unwrap();
        assert_eq!(query.statuses.len(), 2);
        assert_eq!(query.name.as_deref(), Some("cup"));
    }
}
