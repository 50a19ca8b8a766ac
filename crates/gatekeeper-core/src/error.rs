//! Domain error types.

use thiserror::Error;

use crate::identifier::Identifier;

/// Result alias used across the domain.
pub type DomainResult<T> = Result<T, DomainError>;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A string could not be parsed as an identifier.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// A uniqueness rule was violated (e.g. an email already in use).
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// An aggregate was not found.
    #[error("aggregate not found: {0}")]
    AggregateNotFound(Identifier),

    /// Optimistic concurrency conflict.
    #[error("concurrency conflict on aggregate {aggregate_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The aggregate that had the conflict.
        aggregate_id: Identifier,
        /// The expected version.
        expected: i64,
        /// The actual version found.
        actual: i64,
    },

    /// Reconstitution was attempted from an empty history.
    #[error("cannot reconstitute an aggregate from an empty history")]
    EmptyHistory,

    /// The first event of a history is not a creation event.
    #[error("first event of the history must be a creation event")]
    MissingCreationEvent,

    /// A creation event appeared after the start of a history.
    #[error("duplicate creation event at version {version}")]
    DuplicateCreationEvent {
        /// Version carried by the offending event.
        version: i64,
    },

    /// A stored history breaks the stream invariants: the creation event is
    /// not at version 1, versions are not consecutive, or an event belongs
    /// to another aggregate.
    #[error("corrupt history for aggregate {aggregate_id} at version {version}: {reason}")]
    CorruptHistory {
        /// Aggregate whose history was being replayed.
        aggregate_id: Identifier,
        /// Version carried by the offending event.
        version: i64,
        /// Which invariant the event breaks.
        reason: String,
    },

    /// No handler has been registered for the dispatched request type.
    #[error("no handler registered for {0}")]
    NoHandlerRegistered(&'static str),

    /// A second handler was registered for the same request type.
    #[error("handler already registered for {0}")]
    DuplicateHandler(&'static str),

    /// An infrastructure/persistence error.
    #[error("storage error: {0}")]
    Storage(String),

    /// The event publisher failed to deliver events.
    #[error("publish error: {0}")]
    Publish(String),
}

impl DomainError {
    /// Returns `true` for failures caused by the caller's input.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidIdentifier(_)
                | Self::Validation(_)
                | Self::AlreadyExists(_)
                | Self::AggregateNotFound(_)
        )
    }

    /// Returns `true` for failures raised by the server side or its
    /// collaborators.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }
}
