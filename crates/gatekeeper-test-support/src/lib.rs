//! Shared test doubles for the Gatekeeper identity service.

mod clock;
mod publisher;
mod store;

pub use clock::FixedClock;
pub use publisher::{FailingEventPublisher, RecordingEventPublisher};
pub use store::{
    ConflictingEventStore, EmptyEventStore, FailingEventStore, RecordingEventStore, SavedBatch,
};
