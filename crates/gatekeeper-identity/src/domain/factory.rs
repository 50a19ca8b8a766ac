//! Creation and reconstitution of `User` aggregates.

use gatekeeper_core::aggregate::AggregateRoot;
use gatekeeper_core::clock::Clock;
use gatekeeper_core::error::DomainError;
use gatekeeper_core::store::StoredEvent;
use uuid::Uuid;

use super::aggregates::User;
use super::events::UserEvent;
use super::value_objects::{Email, Username};

/// The only way to obtain a [`User`].
#[derive(Debug, Clone, Copy)]
pub struct UserFactory;

impl UserFactory {
    /// Registers a brand-new user under a fresh id.
    ///
    /// The returned aggregate is at version 1 with its `UserCreated` event
    /// pending commit.
    #[must_use]
    pub fn create(
        username: Username,
        email: Email,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> User {
        User::register(username, email, correlation_id, clock)
    }

    /// Rebuilds a user from its full history, oldest first.
    ///
    /// The first event is folded directly; every later event goes through
    /// the same no-op rules as live mutation. The result has no pending
    /// events, since the history is already persisted.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::EmptyHistory` for an empty history,
    /// `DomainError::MissingCreationEvent` if the first event is not
    /// `UserCreated`, `DomainError::DuplicateCreationEvent` if a later one
    /// is, and `DomainError::CorruptHistory` unless versions run 1, 2, 3, ...
    /// within a single aggregate.
    pub fn reconstitute(events: Vec<UserEvent>) -> Result<User, DomainError> {
        let mut events = events.into_iter();
        let first = events.next().ok_or(DomainError::EmptyHistory)?;
        let mut user = User::from_creation(first)?;
        for event in events {
            user.replay(event)?;
        }
        user.clear_uncommitted_events();
        Ok(user)
    }

    /// Converts stored events and rebuilds the user from them.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Storage` for a payload that fails to convert,
    /// otherwise the errors of [`UserFactory::reconstitute`].
    pub fn reconstitute_stored(stored: &[StoredEvent]) -> Result<User, DomainError> {
        let events = stored
            .iter()
            .map(UserEvent::from_stored)
            .collect::<Result<Vec<_>, _>>()?;
        Self::reconstitute(events)
    }
}
