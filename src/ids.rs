//! Identifiers - opaque handles into the declaration store
//!
//! Two kinds of identifiers cross the store boundary:
//! - `DeclHandle`: a 32-bit index addressing one declaration
//! - `ErrorNodeId`: a 64-bit error-set node identifier
//!
//! `ErrorNodeId` values can exceed the range a JSON consumer can represent
//! exactly, so they serialize as a tagged string once they leave
//! `[0, 2^53 - 1]`: `u64:18446744073709551615`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Largest integer a JSON number can carry without rounding in a
/// double-precision consumer.
pub const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// Prefix marking a 64-bit value encoded as a decimal string.
pub const U64_TAG: &str = "u64:";

/// Opaque reference to one declaration inside a store session.
///
/// Handles are only meaningful for the store that produced them and are not
/// stable across sessions. "Not found" is never a handle value; it is
/// `Option::None` at every API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeclHandle(pub u32);

impl DeclHandle {
    /// Raw value backends use to signal "not found".
    pub const SENTINEL: u32 = u32::MAX;

    /// Convert a raw backend value, mapping the sentinel to `None`.
    pub fn from_raw(raw: u32) -> Option<Self> {
        (raw != Self::SENTINEL).then_some(Self(raw))
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for DeclHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A 64-bit error-set node identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ErrorNodeId(pub u64);

impl ErrorNodeId {
    /// Node id `0` means "no error set".
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Parse the tagged string form, e.g. `u64:9007199254740993`.
    pub fn parse_tagged(s: &str) -> Option<Self> {
        let digits = s.strip_prefix(U64_TAG)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().map(Self)
    }

    pub fn to_tagged(self) -> String {
        format!("{}{}", U64_TAG, self.0)
    }
}

impl fmt::Display for ErrorNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for ErrorNodeId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if self.0 > MAX_SAFE_INTEGER {
            serializer.serialize_str(&self.to_tagged())
        } else {
            serializer.serialize_u64(self.0)
        }
    }
}

impl<'de> Deserialize<'de> for ErrorNodeId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(u64),
            Tagged(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(n) => Ok(Self(n)),
            Repr::Tagged(s) => Self::parse_tagged(&s).ok_or_else(|| {
                serde::de::Error::custom(format!("invalid tagged 64-bit value: {s:?}"))
            }),
        }
    }
}
