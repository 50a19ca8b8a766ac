//! Test publishers — mock `EventPublisher` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use gatekeeper_core::error::DomainError;
use gatekeeper_core::event::DomainEvent;
use gatekeeper_core::publisher::EventPublisher;

/// A publisher that keeps every event it is handed, in order.
#[derive(Debug)]
pub struct RecordingEventPublisher<E> {
    published: Mutex<Vec<E>>,
}

impl<E: Clone> RecordingEventPublisher<E> {
    /// Creates a publisher with nothing recorded.
    #[must_use]
    pub fn new() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
        }
    }

    /// Returns a snapshot of all published events.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn published(&self) -> Vec<E> {
        self.published.lock().unwrap().clone()
    }
}

impl<E: Clone> Default for RecordingEventPublisher<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E> EventPublisher<E> for RecordingEventPublisher<E>
where
    E: DomainEvent + Clone,
{
    async fn publish(&self, event: &E) -> Result<(), DomainError> {
        self.published.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// A publisher that rejects every event.
#[derive(Debug)]
pub struct FailingEventPublisher;

#[async_trait]
impl<E: DomainEvent> EventPublisher<E> for FailingEventPublisher {
    async fn publish(&self, _event: &E) -> Result<(), DomainError> {
        Err(DomainError::Publish("broker unavailable".into()))
    }
}
