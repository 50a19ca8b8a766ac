//! In-memory event store for tests and single-process deployments.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;

use gatekeeper_core::error::DomainError;
use gatekeeper_core::identifier::Identifier;
use gatekeeper_core::store::{EventStore, StoredEvent};

#[derive(Debug, Default)]
struct Streams {
    by_aggregate: HashMap<Identifier, Vec<StoredEvent>>,
    event_ids: HashSet<Identifier>,
}

/// Append-only event streams keyed by aggregate id, guarded by a single lock.
///
/// The version check and the append happen under the same write guard, so
/// concurrent writers with the same expected version cannot both succeed.
/// Event ids are unique across all streams.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<Streams>,
}

impl InMemoryEventStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of aggregates with at least one stored event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Storage` if the lock is poisoned.
    pub fn stream_count(&self) -> Result<usize, DomainError> {
        let streams = self.streams.read().map_err(|_| poisoned())?;
        Ok(streams.by_aggregate.len())
    }
}

fn poisoned() -> DomainError {
    DomainError::Storage("event store lock poisoned".to_owned())
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn get_events(&self, aggregate_id: Identifier) -> Result<Vec<StoredEvent>, DomainError> {
        let streams = self.streams.read().map_err(|_| poisoned())?;
        Ok(streams
            .by_aggregate
            .get(&aggregate_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_events(
        &self,
        aggregate_id: Identifier,
        events: &[StoredEvent],
        expected_version: i64,
    ) -> Result<(), DomainError> {
        if events.is_empty() {
            return Ok(());
        }

        if let Some((idx, stray)) = events
            .iter()
            .enumerate()
            .find(|(_, e)| e.aggregate_id != aggregate_id)
        {
            return Err(DomainError::Validation(format!(
                "event at index {idx} belongs to aggregate {} not {aggregate_id}",
                stray.aggregate_id
            )));
        }

        let mut guard = self.streams.write().map_err(|_| poisoned())?;
        let Streams {
            by_aggregate,
            event_ids,
        } = &mut *guard;

        let actual = by_aggregate
            .get(&aggregate_id)
            .and_then(|stream| stream.last())
            .map_or(0, |e| e.version);
        if actual != expected_version {
            tracing::warn!(
                %aggregate_id,
                expected = expected_version,
                actual,
                "optimistic concurrency check failed"
            );
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual,
            });
        }

        let mut batch_ids = HashSet::with_capacity(events.len());
        if let Some(duplicate) = events
            .iter()
            .find(|e| event_ids.contains(&e.event_id) || !batch_ids.insert(e.event_id))
        {
            tracing::error!(%aggregate_id, event_id = %duplicate.event_id, "duplicate event id");
            return Err(DomainError::Storage(format!(
                "event {} is already stored",
                duplicate.event_id
            )));
        }

        event_ids.extend(batch_ids);
        let stream = by_aggregate.entry(aggregate_id).or_default();
        stream.extend(events.iter().zip(expected_version + 1..).map(|(event, version)| {
            StoredEvent {
                version,
                ..event.clone()
            }
        }));

        tracing::info!(
            %aggregate_id,
            event_count = events.len(),
            version = stream.last().map_or(0, |e| e.version),
            "events appended"
        );
        Ok(())
    }

    async fn current_version(&self, aggregate_id: Identifier) -> Result<i64, DomainError> {
        let streams = self.streams.read().map_err(|_| poisoned())?;
        Ok(streams
            .by_aggregate
            .get(&aggregate_id)
            .and_then(|stream| stream.last())
            .map_or(0, |e| e.version))
    }
}
