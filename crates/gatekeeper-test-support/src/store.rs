//! Test stores — mock `EventStore` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use gatekeeper_core::error::DomainError;
use gatekeeper_core::identifier::Identifier;
use gatekeeper_core::store::{EventStore, StoredEvent};

/// Saved batch as recorded by [`RecordingEventStore`]:
/// `(aggregate_id, expected_version, events)`.
pub type SavedBatch = (Identifier, i64, Vec<StoredEvent>);

/// An event store that records all `save_events` calls. Returns the
/// configured history from every `get_events` call and always accepts saves
/// without checking versions.
#[derive(Debug)]
pub struct RecordingEventStore {
    history: Vec<StoredEvent>,
    saved: Mutex<Vec<SavedBatch>>,
}

impl RecordingEventStore {
    /// Create a recording store that returns `history` from every
    /// `get_events` call.
    #[must_use]
    pub fn new(history: Vec<StoredEvent>) -> Self {
        Self {
            history,
            saved: Mutex::new(Vec::new()),
        }
    }

    /// Returns a snapshot of all batches that were saved.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn saved_events(&self) -> Vec<SavedBatch> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventStore for RecordingEventStore {
    async fn get_events(&self, _aggregate_id: Identifier) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self.history.clone())
    }

    async fn save_events(
        &self,
        aggregate_id: Identifier,
        events: &[StoredEvent],
        expected_version: i64,
    ) -> Result<(), DomainError> {
        self.saved
            .lock()
            .unwrap()
            .push((aggregate_id, expected_version, events.to_vec()));
        Ok(())
    }
}

/// An event store that always returns an empty history and silently accepts
/// saves. Useful for "aggregate not found" scenarios and creation commands.
#[derive(Debug)]
pub struct EmptyEventStore;

#[async_trait]
impl EventStore for EmptyEventStore {
    async fn get_events(&self, _aggregate_id: Identifier) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(vec![])
    }

    async fn save_events(
        &self,
        _aggregate_id: Identifier,
        _events: &[StoredEvent],
        _expected_version: i64,
    ) -> Result<(), DomainError> {
        Ok(())
    }
}

/// An event store that always returns a storage error. Useful for testing
/// error-handling paths.
#[derive(Debug)]
pub struct FailingEventStore;

#[async_trait]
impl EventStore for FailingEventStore {
    async fn get_events(&self, _aggregate_id: Identifier) -> Result<Vec<StoredEvent>, DomainError> {
        Err(DomainError::Storage("connection refused".into()))
    }

    async fn save_events(
        &self,
        _aggregate_id: Identifier,
        _events: &[StoredEvent],
        _expected_version: i64,
    ) -> Result<(), DomainError> {
        Err(DomainError::Storage("connection refused".into()))
    }
}

/// An event store that serves `history` but rejects every save as if
/// another writer had appended one event first.
#[derive(Debug)]
pub struct ConflictingEventStore {
    history: Vec<StoredEvent>,
}

impl ConflictingEventStore {
    /// Create a store that returns `history` and rejects all saves.
    #[must_use]
    pub fn new(history: Vec<StoredEvent>) -> Self {
        Self { history }
    }
}

#[async_trait]
impl EventStore for ConflictingEventStore {
    async fn get_events(&self, _aggregate_id: Identifier) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self.history.clone())
    }

    async fn save_events(
        &self,
        aggregate_id: Identifier,
        _events: &[StoredEvent],
        expected_version: i64,
    ) -> Result<(), DomainError> {
        Err(DomainError::ConcurrencyConflict {
            aggregate_id,
            expected: expected_version,
            actual: expected_version + 1,
        })
    }
}
