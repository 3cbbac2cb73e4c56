//! Core vocabulary types shared by every Matchbook layer.
//!
//! Everything here is a small value type: identifiers, the two closed
//! enums that drive the session state machine, and the validated country
//! code. None of them own any I/O.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A unique identifier for an advertised game session.
///
/// Assigned by the store on creation and never reused. Same newtype
/// pattern as any other ID in the workspace: it can't be confused with a
/// plain integer, and `#[serde(transparent)]` keeps it a bare number on
/// the wire.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// GameStatus: the session state machine
// ---------------------------------------------------------------------------

/// Where a game session is in its life.
///
/// Transitions only move forward:
///
/// ```text
/// WAITING ──→ PLAYING ──→ FINISHED
///    └─────────────────────↑
/// ```
///
/// `FINISHED` is terminal. `WAITING` is the initial state and can never
/// be requested through an update.
///
/// Variants are declared in lifecycle order, so the derived `Ord` is the
/// lifecycle order too.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    Waiting,
    Playing,
    Finished,
}

impl GameStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [GameStatus; 3] = [Self::Waiting, Self::Playing, Self::Finished];

    /// Statuses a client may request through an update.
    pub fn settable() -> [GameStatus; 2] {
        [Self::Playing, Self::Finished]
    }

    /// Returns `true` if no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished)
    }

    /// Returns `true` if moving from `self` to `target` is a forward move.
    ///
    /// Skipping `PLAYING` is allowed (a game can be abandoned before it
    /// starts), staying put or moving backward is not.
    pub fn can_advance_to(self, target: Self) -> bool {
        target != Self::Waiting && target > self
    }

    /// Upper-case wire name (`"WAITING"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "WAITING",
            Self::Playing => "PLAYING",
            Self::Finished => "FINISHED",
        }
    }

    /// Human-readable label (`"Waiting"`).
    pub fn label(self) -> &'static str {
        match self {
            Self::Waiting => "Waiting",
            Self::Playing => "Playing",
            Self::Finished => "Finished",
        }
    }
}

impl Default for GameStatus {
    fn default() -> Self {
        Self::Waiting
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameStatus {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ProtocolError::InvalidValue {
                value: s.to_string(),
                allowed: join(Self::ALL.iter().map(|s| s.as_str())),
            })
    }
}

// ---------------------------------------------------------------------------
// Winner
// ---------------------------------------------------------------------------

/// The two sides of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Winner {
    Red,
    Yellow,
}

impl Winner {
    pub const ALL: [Winner; 2] = [Self::Red, Self::Yellow];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Red => "RED",
            Self::Yellow => "YELLOW",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Red => "Red",
            Self::Yellow => "Yellow",
        }
    }
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Winner {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|winner| winner.as_str() == s)
            .ok_or_else(|| ProtocolError::InvalidValue {
                value: s.to_string(),
                allowed: join(Self::ALL.iter().map(|w| w.as_str())),
            })
    }
}

fn join<'a>(values: impl Iterator<Item = &'a str>) -> String {
    values.collect::<Vec<_>>().join(", ")
}

// ---------------------------------------------------------------------------
// CountryCode
// ---------------------------------------------------------------------------

/// A validated ISO 3166-1 alpha-2 country code (`"FR"`, `"US"`, ...).
///
/// The only way to build one is [`CountryCode::parse`], so holding a
/// `CountryCode` means the code is known. Input is trimmed and
/// upper-cased before lookup, so `" fr"` parses as `FR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CountryCode(&'static str);

impl CountryCode {
    /// Validates `code` against the ISO 3166-1 alpha-2 table.
    pub fn parse(code: &str) -> Result<Self, ProtocolError> {
        let normalized = code.trim().to_ascii_uppercase();
        isocountry::CountryCode::for_alpha2(&normalized)
            .map(|c| Self(c.alpha2()))
            .map_err(|_| ProtocolError::InvalidCountry(code.to_string()))
    }

    /// The two-letter code.
    pub fn as_str(&self) -> &'static str {
        self.0
    }

    /// The English short name of the country (`"France"`).
    pub fn name(&self) -> &'static str {
        isocountry::CountryCode::for_alpha2(self.0)
            .map(|c| c.name())
            .unwrap_or(self.0)
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl FromStr for CountryCode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for CountryCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0)
    }
}

impl<'de> Deserialize<'de> for CountryCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Caller address
// ---------------------------------------------------------------------------

/// Picks the address a request should be attributed to.
///
/// Behind a reverse proxy the socket peer is the proxy itself, so the
/// first entry of `X-Forwarded-For` wins when present and non-empty.
/// Otherwise the peer address is used.
pub fn client_address(forwarded_for: Option<&str>, peer: &str) -> String {
    forwarded_for
        .and_then(|header| header.split(',').next())
        .map(str::trim)
        .filter(|first| !first.is_empty())
        .unwrap_or(peer)
        .to_string()
}

// =========================================================================
// Tests
// =========================================================================
