//! Identifiers used throughout the OMS.
//!
//! Entity IDs use UUIDv7 for time-ordered lexicographic sorting.
//! [`AssetName`] is a validated ticker (`[A-Z0-9_]{2,16}`).

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{OmsError, Result, constants};

// ---------------------------------------------------------------------------
// OrderId
// ---------------------------------------------------------------------------

/// Globally unique order identifier. Uses UUIDv7 for time-ordered sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct OrderId(pub Uuid);

impl OrderId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// CustomerId
// ---------------------------------------------------------------------------

/// Unique identifier for a brokerage customer.
///
/// Orders and assets carry it as a lookup key only; no customer state
/// lives in this engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct CustomerId(pub Uuid);

impl CustomerId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for CustomerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// AssetId
// ---------------------------------------------------------------------------

/// Row identifier of a persisted asset balance. Assigned by the store on
/// first write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AssetId(pub Uuid);

impl AssetId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for AssetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asset:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// AssetName
// ---------------------------------------------------------------------------

/// A validated asset ticker such as `"TRY"` or `"XYZ"`.
///
/// Two to sixteen characters, each an ASCII uppercase letter, a digit or
/// an underscore.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetName(String);

impl AssetName {
    /// Validate and wrap an asset name.
    ///
    /// # Errors
    /// Returns [`OmsError::Validation`] if the name is blank, has the wrong
    /// length, or contains a character outside `[A-Z0-9_]`.
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(OmsError::validation("asset_name", "asset name is required"));
        }
        let len = raw.chars().count();
        let valid_chars = raw
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
        if !(constants::ASSET_NAME_MIN_LEN..=constants::ASSET_NAME_MAX_LEN).contains(&len)
            || !valid_chars
        {
            return Err(OmsError::validation(
                "asset_name",
                format!(
                    "asset name must match [A-Z0-9_]{{{},{}}}, got {raw:?}",
                    constants::ASSET_NAME_MIN_LEN,
                    constants::ASSET_NAME_MAX_LEN
                ),
            ));
        }
        Ok(Self(raw))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AssetName {
    type Error = OmsError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl TryFrom<&str> for AssetName {
    type Error = OmsError;

    fn try_from(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<AssetName> for String {
    fn from(name: AssetName) -> Self {
        name.0
    }
}

impl AsRef<str> for AssetName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
