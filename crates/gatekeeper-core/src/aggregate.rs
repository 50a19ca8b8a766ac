//! Aggregate root abstraction.

use chrono::{DateTime, Utc};

use crate::error::DomainError;
use crate::event::DomainEvent;
use crate::identifier::Identifier;
use crate::publisher::EventPublisher;

/// Trait for aggregate roots whose state is folded from an event history.
///
/// Implementors keep `version` equal to the version of the last applied
/// event and record every applied event in an uncommitted buffer that only
/// [`commit`] drains.
pub trait AggregateRoot: Send + Sync {
    /// The event type this aggregate produces and consumes.
    type Event: DomainEvent;

    /// Returns the aggregate identifier.
    fn aggregate_id(&self) -> Identifier;

    /// Returns the version of the last applied event (0 before any event).
    fn version(&self) -> i64;

    /// Returns the timestamp of the last applied event.
    fn updated_at(&self) -> DateTime<Utc>;

    /// Applies an event: updates state for its kind, moves `version` and
    /// `updated_at` to the event's values and records it as uncommitted.
    fn apply_event(&mut self, event: Self::Event);

    /// Returns uncommitted events produced since construction or the last
    /// commit, in the order they were applied.
    fn uncommitted_events(&self) -> &[Self::Event];

    /// Clears uncommitted events after they have been published.
    fn clear_uncommitted_events(&mut self);

    /// Returns the version of the last event the store already holds, i.e.
    /// the expected version for persisting the uncommitted events.
    #[allow(clippy::cast_possible_wrap)]
    fn persisted_version(&self) -> i64 {
        self.version() - self.uncommitted_events().len() as i64
    }
}

/// Delivers the aggregate's uncommitted events to `publisher`, then clears
/// them.
///
/// On failure the events stay pending so the caller can retry the commit
/// without recomputing state.
///
/// # Errors
///
/// Returns `DomainError::Publish` (or whatever the publisher reports) if
/// delivery fails.
pub async fn commit<A>(
    aggregate: &mut A,
    publisher: &dyn EventPublisher<A::Event>,
) -> Result<(), DomainError>
where
    A: AggregateRoot,
{
    if aggregate.uncommitted_events().is_empty() {
        return Ok(());
    }

    publisher.publish_all(aggregate.uncommitted_events()).await?;

    tracing::debug!(
        aggregate_id = %aggregate.aggregate_id(),
        version = aggregate.version(),
        event_count = aggregate.uncommitted_events().len(),
        "committed uncommitted events"
    );

    aggregate.clear_uncommitted_events();
    Ok(())
}
