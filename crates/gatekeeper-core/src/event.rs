//! Event envelope shared by every aggregate.
//!
//! Concrete event enums carry their payload next to an [`EventMetadata`] and
//! expose both through [`DomainEvent`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identifier::Identifier;

/// Envelope fields common to all events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    pub event_id: Identifier,
    /// Stable name such as `user.created`.
    pub event_type: String,
    /// Stream the event is appended to.
    pub aggregate_id: Identifier,
    /// Aggregate version produced by this event (1 for the creation event).
    pub version: i64,
    /// Copied from the command that produced the event.
    pub correlation_id: Uuid,
    /// Read from the injected clock when the event is recorded.
    pub occurred_at: DateTime<Utc>,
}

impl EventMetadata {
    /// Builds metadata for a freshly produced event with a random event id.
    #[must_use]
    pub fn new(
        event_type: &str,
        aggregate_id: Identifier,
        version: i64,
        correlation_id: Uuid,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: Identifier::generate(),
            event_type: event_type.to_owned(),
            aggregate_id,
            version,
            correlation_id,
            occurred_at,
        }
    }
}

/// An event an aggregate can record, persist and publish.
pub trait DomainEvent: Send + Sync + std::fmt::Debug {
    /// Stable name stored next to the payload.
    fn event_type(&self) -> &'static str;

    /// Payload as stored in the event store.
    fn to_payload(&self) -> serde_json::Value;

    fn metadata(&self) -> &EventMetadata;

    /// Returns the aggregate version produced by this event.
    fn version(&self) -> i64 {
        self.metadata().version
    }
}
