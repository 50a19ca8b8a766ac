//! Gatekeeper event store — storage and publishing adapters.
//!
//! Provides an in-memory and a PostgreSQL implementation of the core
//! `EventStore` port, and a channel-backed `EventPublisher`.

pub mod channel_publisher;
pub mod in_memory;
pub mod pg_event_store;
pub mod schema;

pub use channel_publisher::ChannelEventPublisher;
pub use in_memory::InMemoryEventStore;
pub use pg_event_store::PgEventStore;
