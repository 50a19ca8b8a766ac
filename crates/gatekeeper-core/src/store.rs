//! Event persistence port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DomainError;
use crate::event::{DomainEvent, EventMetadata};
use crate::identifier::Identifier;

/// An event flattened for storage: envelope columns plus a JSON payload.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEvent {
    pub event_id: Identifier,
    pub aggregate_id: Identifier,
    /// Selects the payload variant on the way back.
    pub event_type: String,
    /// Payload produced by [`DomainEvent::to_payload`].
    pub payload: serde_json::Value,
    /// Position in the stream, starting at 1.
    pub version: i64,
    pub correlation_id: Uuid,
    pub occurred_at: DateTime<Utc>,
}

impl StoredEvent {
    /// Converts a domain event into its stored form.
    #[must_use]
    pub fn from_event<E: DomainEvent>(event: &E) -> Self {
        let EventMetadata {
            event_id,
            aggregate_id,
            version,
            correlation_id,
            occurred_at,
            ..
        } = *event.metadata();
        Self {
            event_id,
            aggregate_id,
            event_type: event.event_type().to_owned(),
            payload: event.to_payload(),
            version,
            correlation_id,
            occurred_at,
        }
    }
}

/// Port for persisting and reading per-aggregate event streams.
///
/// `expected_version` is the version of the last event already persisted for
/// the aggregate (0 for a new aggregate). New events receive versions
/// `expected_version + 1`, `expected_version + 2`, ...
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Full history of the aggregate, oldest first. Unknown ids yield an
    /// empty vector.
    async fn get_events(&self, aggregate_id: Identifier) -> Result<Vec<StoredEvent>, DomainError>;

    /// Appends `events` to the stream if its current version is still
    /// `expected_version`.
    ///
    /// Either every event is persisted or none is. A stale
    /// `expected_version` fails with `DomainError::ConcurrencyConflict`.
    async fn save_events(
        &self,
        aggregate_id: Identifier,
        events: &[StoredEvent],
        expected_version: i64,
    ) -> Result<(), DomainError>;

    /// Returns the highest version stored for the aggregate (0 if none).
    async fn current_version(&self, aggregate_id: Identifier) -> Result<i64, DomainError> {
        let events = self.get_events(aggregate_id).await?;
        Ok(events.last().map_or(0, |e| e.version))
    }
}
