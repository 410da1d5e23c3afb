// Copyright (c) 2025 - Cowboy AI, Inc.
//! Friendly Identifier Value Object
//!
//! The identity key of every landscape device. It is derived once from a
//! configuration entry and never changes afterwards.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Friendly identifier validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FriendlyIdentifierError {
    #[error("Identifier is empty")]
    Empty,

    #[error("Identifier exceeds maximum length of 128 characters: {0}")]
    TooLong(usize),

    #[error("Invalid character in identifier: {0:?}")]
    InvalidCharacter(char),

    #[error("Configuration entry has no 'identifier', 'name' or 'host' field")]
    Missing,
}

/// Validated device identity
///
/// # Invariants
/// - Non-empty
/// - At most 128 characters
/// - ASCII alphanumerics plus `-`, `_`, `.`, `:`, `/`, `@`
///
/// # Examples
///
/// ```rust
/// use cim_landscape::domain::FriendlyIdentifier;
///
/// let id = FriendlyIdentifier::new("node-a").unwrap();
/// assert_eq!(id.as_str(), "node-a");
///
/// assert!(FriendlyIdentifier::new("").is_err());
/// assert!(FriendlyIdentifier::new("has space").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FriendlyIdentifier(String);

impl FriendlyIdentifier {
    /// Maximum identifier length
    pub const MAX_LENGTH: usize = 128;

    /// Punctuation allowed besides ASCII alphanumerics
    const ALLOWED_PUNCTUATION: &'static [char] = &['-', '_', '.', ':', '/', '@'];

    /// Create a new identifier with validation
    pub fn new(value: impl Into<String>) -> Result<Self, FriendlyIdentifierError> {
        let value = value.into();

        if value.is_empty() {
            return Err(FriendlyIdentifierError::Empty);
        }

        if value.chars().count() > Self::MAX_LENGTH {
            return Err(FriendlyIdentifierError::TooLong(value.chars().count()));
        }

        if let Some(ch) = value
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && !Self::ALLOWED_PUNCTUATION.contains(c))
        {
            return Err(FriendlyIdentifierError::InvalidCharacter(ch));
        }

        Ok(Self(value))
    }

    /// Derive the identifier of a configuration entry
    ///
    /// Looks at `identifier`, then `name`, then `host`. The first string
    /// field present wins, even if it then fails validation.
    pub fn from_config(entry: &Map<String, Value>) -> Result<Self, FriendlyIdentifierError> {
        ["identifier", "name", "host"]
            .iter()
            .find_map(|field| entry.get(*field).and_then(Value::as_str))
            .ok_or(FriendlyIdentifierError::Missing)
            .and_then(Self::new)
    }

    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FriendlyIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for FriendlyIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for FriendlyIdentifier {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for FriendlyIdentifier {
    type Error = FriendlyIdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for FriendlyIdentifier {
    type Error = FriendlyIdentifierError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FriendlyIdentifier> for String {
    fn from(value: FriendlyIdentifier) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_valid_identifiers() {
        assert!(FriendlyIdentifier::new("node-a").is_ok());
        assert!(FriendlyIdentifier::new("10.0.0.5").is_ok());
        assert!(FriendlyIdentifier::new("pdu01:outlet/3").is_ok());
        assert!(FriendlyIdentifier::new("admin@rack_2").is_ok());
    }

    #[test]
    fn test_invalid_identifiers() {
        assert_eq!(
            FriendlyIdentifier::new(""),
            Err(FriendlyIdentifierError::Empty)
        );
        assert_eq!(
            FriendlyIdentifier::new("node a"),
            Err(FriendlyIdentifierError::InvalidCharacter(' '))
        );
        assert!(matches!(
            FriendlyIdentifier::new("x".repeat(129)),
            Err(FriendlyIdentifierError::TooLong(129))
        ));
        assert!(FriendlyIdentifier::new("x".repeat(128)).is_ok());
    }

    #[test]
    fn test_from_config_precedence() {
        let all = entry(json!({"identifier": "id", "name": "nm", "host": "h"}));
        assert_eq!(FriendlyIdentifier::from_config(&all).unwrap().as_str(), "id");

        let name_host = entry(json!({"name": "nm", "host": "h"}));
        assert_eq!(
            FriendlyIdentifier::from_config(&name_host).unwrap().as_str(),
            "nm"
        );

        let host = entry(json!({"host": "10.1.1.1"}));
        assert_eq!(
            FriendlyIdentifier::from_config(&host).unwrap().as_str(),
            "10.1.1.1"
        );
    }

    #[test]
    fn test_from_config_missing() {
        let none = entry(json!({"deviceType": "ssh"}));
        assert_eq!(
            FriendlyIdentifier::from_config(&none),
            Err(FriendlyIdentifierError::Missing)
        );
    }

    #[test]
    fn test_serde_validates() {
        let ok: FriendlyIdentifier = serde_json::from_str("\"node-a\"").unwrap();
        assert_eq!(ok.as_str(), "node-a");
        assert!(serde_json::from_str::<FriendlyIdentifier>("\"bad id\"").is_err());
    }
}
