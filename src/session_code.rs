//! Session code generation and management
//!
//! This module provides the short numeric codes that identify running
//! sessions. Codes are four decimal digits so a host can read one out
//! loud and players can type it on any keyboard.

use std::{fmt::Display, num::ParseIntError, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};

/// Minimum value for generated session codes (inclusive)
const MIN_VALUE: u16 = 1000;
/// Maximum value for generated session codes (exclusive)
const MAX_VALUE: u16 = 10_000;

/// A short numeric identifier for a running session
///
/// Codes are generated randomly within a fixed range; uniqueness among
/// live sessions is the registry's responsibility (collisions are
/// retried, not fatal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionCode(u16);

impl SessionCode {
    /// Creates a new random session code
    pub fn new() -> Self {
        Self(fastrand::u16(MIN_VALUE..MAX_VALUE))
    }
}

impl Default for SessionCode {
    /// Creates a new random session code (same as `new()`)
    fn default() -> Self {
        Self::new()
    }
}

impl Display for SessionCode {
    /// Formats the code as a 4-digit decimal number
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

impl Serialize for SessionCode {
    /// Serializes the session code as a decimal string
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for SessionCode {
    /// Deserializes a session code from a decimal string
    fn deserialize<D>(deserializer: D) -> Result<SessionCode, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        SessionCode::from_str(&s).map_err(|e| serde::de::Error::custom(e.to_string()))
    }
}

impl FromStr for SessionCode {
    type Err = ParseIntError;

    /// Parses a session code from its decimal string representation
    ///
    /// # Errors
    ///
    /// Returns a `ParseIntError` if the string is not a valid decimal
    /// number in range.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(u16::from_str(s)?))
    }
}
