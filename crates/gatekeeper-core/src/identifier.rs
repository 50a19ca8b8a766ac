//! Strongly-typed identifier for aggregates and events.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Opaque 128-bit identity shared by aggregates and events.
///
/// Equality and hashing are by the wrapped value. New identifiers are
/// random (UUID v4).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(Uuid);

impl Identifier {
    /// Generates a new random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parses the canonical string form.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidIdentifier` if `value` is not a valid UUID.
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        value.parse()
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for Identifier {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| DomainError::InvalidIdentifier(s.to_owned()))
    }
}

impl From<Uuid> for Identifier {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<Identifier> for Uuid {
    fn from(value: Identifier) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_produces_distinct_identifiers() {
        let a = Identifier::generate();
        let b = Identifier::generate();

        assert_ne!(a, b);
    }

    #[test]
    fn test_parse_accepts_canonical_form() {
        // Arrange
        let uuid = Uuid::new_v4();

        // Act
        let parsed = Identifier::parse(&uuid.to_string()).unwrap();

        // Assert
        assert_eq!(parsed.as_uuid(), uuid);
        assert_eq!(parsed.to_string(), uuid.to_string());
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        let result = Identifier::parse("not-a-uuid");

        match result {
            Err(DomainError::InvalidIdentifier(value)) => assert_eq!(value, "not-a-uuid"),
            other => panic!("expected InvalidIdentifier, got {other:?}"),
        }
    }

    #[test]
    fn test_equal_values_hash_to_same_bucket() {
        use std::collections::HashSet;

        let uuid = Uuid::new_v4();
        let mut set = HashSet::new();
        set.insert(Identifier::from_uuid(uuid));
        set.insert(Identifier::from(uuid));

        assert_eq!(set.len(), 1);
    }
}
