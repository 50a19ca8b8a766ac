//! Domain events for the identity context.

use chrono::{DateTime, Utc};
use gatekeeper_core::error::DomainError;
use gatekeeper_core::event::{DomainEvent, EventMetadata};
use gatekeeper_core::identifier::Identifier;
use gatekeeper_core::store::StoredEvent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value_objects::{Email, Username};

/// Emitted when a new user is registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCreated {
    /// The initial username.
    pub username: Username,
    /// The initial email address.
    pub email: Email,
}

/// Emitted when a user's email address changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailChanged {
    /// The new email address.
    pub new_email: Email,
}

/// Emitted when a user's username changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsernameChanged {
    /// The new username.
    pub new_username: Username,
}

/// Emitted when an enabled account is disabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDisabled {
    /// Why the account was disabled.
    pub reason: String,
}

/// Emitted when a disabled account is enabled again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEnabled;

/// Event payload variants for the identity context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserEventKind {
    /// A user has been registered.
    UserCreated(UserCreated),
    /// The email address has changed.
    EmailChanged(EmailChanged),
    /// The username has changed.
    UsernameChanged(UsernameChanged),
    /// The account has been disabled.
    UserDisabled(UserDisabled),
    /// The account has been enabled.
    UserEnabled(UserEnabled),
}

impl UserEventKind {
    /// Returns the stable type name stored alongside the payload.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::UserCreated(_) => "user.created",
            Self::EmailChanged(_) => "user.email_changed",
            Self::UsernameChanged(_) => "user.username_changed",
            Self::UserDisabled(_) => "user.disabled",
            Self::UserEnabled(_) => "user.enabled",
        }
    }
}

/// Domain event envelope for the identity context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: UserEventKind,
}

impl UserEvent {
    /// Wraps `kind` in fresh metadata with a random event id.
    #[must_use]
    pub fn new(
        kind: UserEventKind,
        aggregate_id: Identifier,
        version: i64,
        correlation_id: Uuid,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            metadata: EventMetadata::new(
                kind.event_type(),
                aggregate_id,
                version,
                correlation_id,
                occurred_at,
            ),
            kind,
        }
    }

    /// Rebuilds an event from its stored form.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Storage` if the payload does not deserialize
    /// (including value objects that no longer validate) or if it does not
    /// match the stored event type.
    pub fn from_stored(stored: &StoredEvent) -> Result<Self, DomainError> {
        let kind: UserEventKind = serde_json::from_value(stored.payload.clone()).map_err(|e| {
            DomainError::Storage(format!(
                "event {} deserialization failed: {e}",
                stored.event_id
            ))
        })?;
        if kind.event_type() != stored.event_type {
            return Err(DomainError::Storage(format!(
                "event {} is stored as {} but its payload is {}",
                stored.event_id,
                stored.event_type,
                kind.event_type()
            )));
        }

        Ok(Self {
            metadata: EventMetadata {
                event_id: stored.event_id,
                event_type: stored.event_type.clone(),
                aggregate_id: stored.aggregate_id,
                version: stored.version,
                correlation_id: stored.correlation_id,
                occurred_at: stored.occurred_at,
            },
            kind,
        })
    }
}

impl DomainEvent for UserEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("UserEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
