//! In-process event publisher backed by a tokio broadcast channel.

use async_trait::async_trait;
use tokio::sync::broadcast;

use gatekeeper_core::error::DomainError;
use gatekeeper_core::event::DomainEvent;
use gatekeeper_core::publisher::EventPublisher;

/// Fans committed events out to every live subscriber.
///
/// Publishing with no subscribers succeeds; the event is simply dropped.
/// Slow subscribers that fall more than `capacity` events behind observe a
/// lag error on their receiver rather than blocking the publisher.
#[derive(Debug, Clone)]
pub struct ChannelEventPublisher<E> {
    sender: broadcast::Sender<E>,
}

impl<E> ChannelEventPublisher<E>
where
    E: DomainEvent + Clone + 'static,
{
    /// Creates a publisher whose channel buffers up to `capacity` events.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Registers a new subscriber that receives events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<E> {
        self.sender.subscribe()
    }

    /// Returns the number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl<E> EventPublisher<E> for ChannelEventPublisher<E>
where
    E: DomainEvent + Clone + 'static,
{
    async fn publish(&self, event: &E) -> Result<(), DomainError> {
        match self.sender.send(event.clone()) {
            Ok(receivers) => {
                tracing::debug!(
                    event_type = event.event_type(),
                    aggregate_id = %event.metadata().aggregate_id,
                    version = event.version(),
                    receivers,
                    "event published"
                );
            }
            Err(_) => {
                tracing::debug!(
                    event_type = event.event_type(),
                    aggregate_id = %event.metadata().aggregate_id,
                    "event published with no subscribers"
                );
            }
        }
        Ok(())
    }
}
