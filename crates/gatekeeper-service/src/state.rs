//! Shared service state.

use std::fmt;
use std::sync::Arc;

use gatekeeper_core::clock::{Clock, SystemClock};
use gatekeeper_core::dispatcher::Dispatcher;
use gatekeeper_core::error::DomainError;
use gatekeeper_core::store::EventStore;
use gatekeeper_event_store::{ChannelEventPublisher, InMemoryEventStore, PgEventStore};
use gatekeeper_identity::application::handlers::IdentityHandlers;
use gatekeeper_identity::domain::directory::UserDirectory;
use gatekeeper_identity::domain::events::UserEvent;
use gatekeeper_identity::infrastructure::InMemoryUserDirectory;
use sqlx::postgres::PgPoolOptions;

use crate::config::ServiceConfig;
use crate::error::AppError;
use crate::wiring;

/// Everything a running service shares across tasks.
#[derive(Clone)]
pub struct AppState {
    /// Routes commands and queries to their handlers.
    pub dispatcher: Arc<Dispatcher>,
    /// Event store backing every aggregate.
    pub event_store: Arc<dyn EventStore>,
    /// In-process publisher of committed user events.
    pub publisher: Arc<ChannelEventPublisher<UserEvent>>,
}

impl AppState {
    /// Wires the handlers over the given ports.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::DuplicateHandler` if handler registration is
    /// inconsistent.
    pub fn new(
        clock: Arc<dyn Clock>,
        event_store: Arc<dyn EventStore>,
        publisher: Arc<ChannelEventPublisher<UserEvent>>,
        directory: Arc<dyn UserDirectory>,
    ) -> Result<Self, DomainError> {
        let identity = IdentityHandlers::new(
            clock,
            Arc::clone(&event_store),
            Arc::clone(&publisher) as _,
            directory,
        );
        let dispatcher = wiring::build_dispatcher(identity)?;
        Ok(Self {
            dispatcher: Arc::new(dispatcher),
            event_store,
            publisher,
        })
    }

    /// Builds the state described by `config`: a PostgreSQL store (schema
    /// applied) when `DATABASE_URL` is set, an in-memory store otherwise.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the pool cannot connect and
    /// `AppError::Domain` if the schema cannot be applied.
    pub async fn from_config(config: &ServiceConfig) -> Result<Self, AppError> {
        let event_store: Arc<dyn EventStore> = match &config.database_url {
            Some(url) => {
                let pool = PgPoolOptions::new()
                    .max_connections(config.database_max_connections)
                    .connect(url)
                    .await?;
                let store = PgEventStore::new(pool);
                store.ensure_schema().await?;
                tracing::info!(
                    max_connections = config.database_max_connections,
                    "using PostgreSQL event store"
                );
                Arc::new(store)
            }
            None => {
                tracing::warn!("DATABASE_URL not set, events are kept in memory");
                Arc::new(InMemoryEventStore::new())
            }
        };
        let publisher = Arc::new(ChannelEventPublisher::new(config.publisher_capacity));
        warn_if_directory_forgets_users(config);

        Ok(Self::new(
            Arc::new(SystemClock),
            event_store,
            publisher,
            Arc::new(InMemoryUserDirectory::new()),
        )?)
    }
}

/// The user directory is always in memory. Against a durable event store it
/// starts empty on every restart: uniqueness checks do not know persisted
/// users and email or username changes of those users fail with
/// `AggregateNotFound`. Returns `true` if that situation was logged.
fn warn_if_directory_forgets_users(config: &ServiceConfig) -> bool {
    if config.database_url.is_none() {
        return false;
    }
    tracing::warn!(
        "user directory is in memory while events are persisted; \
         users stored before this start are unknown to uniqueness checks"
    );
    true
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("dispatcher", &self.dispatcher)
            .field("subscribers", &self.publisher.subscriber_count())
            .finish_non_exhaustive()
    }
}
