//! Dispatcher-facing handler for the identity context.
//!
//! [`IdentityHandlers`] owns the ports the free handler functions need and
//! implements `CommandHandler`/`QueryHandler` for every identity request, so
//! one cloned value is registered per request type.

use std::sync::Arc;

use async_trait::async_trait;
use gatekeeper_core::clock::Clock;
use gatekeeper_core::command::{Command, CommandHandler};
use gatekeeper_core::dispatcher::DispatcherBuilder;
use gatekeeper_core::error::DomainError;
use gatekeeper_core::identifier::Identifier;
use gatekeeper_core::publisher::EventPublisher;
use gatekeeper_core::query::QueryHandler;
use gatekeeper_core::store::{EventStore, StoredEvent};

use crate::application::{command_handlers, query_handlers};
use crate::domain::commands::{ChangeEmail, ChangeUsername, CreateUser, DisableUser, EnableUser};
use crate::domain::directory::UserDirectory;
use crate::domain::events::UserEvent;
use crate::domain::queries::{CheckEmailExists, CheckUsernameExists, GetUserById, UserView};

/// Shared ports for identity command and query handling.
#[derive(Clone)]
pub struct IdentityHandlers {
    clock: Arc<dyn Clock>,
    store: Arc<dyn EventStore>,
    publisher: Arc<dyn EventPublisher<UserEvent>>,
    directory: Arc<dyn UserDirectory>,
}

impl IdentityHandlers {
    /// Creates the handler set.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        store: Arc<dyn EventStore>,
        publisher: Arc<dyn EventPublisher<UserEvent>>,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            clock,
            store,
            publisher,
            directory,
        }
    }

    /// Registers a handler for every identity command and query.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::DuplicateHandler` if `builder` already handles
    /// one of the identity request types.
    pub fn register(self, builder: DispatcherBuilder) -> Result<DispatcherBuilder, DomainError> {
        builder
            .command::<CreateUser, _>(self.clone())?
            .command::<ChangeEmail, _>(self.clone())?
            .command::<ChangeUsername, _>(self.clone())?
            .command::<DisableUser, _>(self.clone())?
            .command::<EnableUser, _>(self.clone())?
            .query::<CheckEmailExists, _>(self.clone())?
            .query::<CheckUsernameExists, _>(self.clone())?
            .query::<GetUserById, _>(self)
    }
}

impl std::fmt::Debug for IdentityHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityHandlers").finish_non_exhaustive()
    }
}

#[async_trait]
impl CommandHandler<CreateUser> for IdentityHandlers {
    #[tracing::instrument(skip_all, fields(command_type = command.command_type()))]
    async fn handle(&self, command: CreateUser) -> Result<Identifier, DomainError> {
        command_handlers::handle_create_user(
            &command,
            self.clock.as_ref(),
            self.store.as_ref(),
            self.publisher.as_ref(),
            self.directory.as_ref(),
        )
        .await
    }
}

#[async_trait]
impl CommandHandler<ChangeEmail> for IdentityHandlers {
    #[tracing::instrument(skip_all, fields(command_type = command.command_type(), aggregate_id = %command.user_id))]
    async fn handle(&self, command: ChangeEmail) -> Result<Vec<StoredEvent>, DomainError> {
        command_handlers::handle_change_email(
            &command,
            self.clock.as_ref(),
            self.store.as_ref(),
            self.publisher.as_ref(),
            self.directory.as_ref(),
        )
        .await
    }
}

#[async_trait]
impl CommandHandler<ChangeUsername> for IdentityHandlers {
    #[tracing::instrument(skip_all, fields(command_type = command.command_type(), aggregate_id = %command.user_id))]
    async fn handle(&self, command: ChangeUsername) -> Result<Vec<StoredEvent>, DomainError> {
        command_handlers::handle_change_username(
            &command,
            self.clock.as_ref(),
            self.store.as_ref(),
            self.publisher.as_ref(),
            self.directory.as_ref(),
        )
        .await
    }
}

#[async_trait]
impl CommandHandler<DisableUser> for IdentityHandlers {
    #[tracing::instrument(skip_all, fields(command_type = command.command_type(), aggregate_id = %command.user_id))]
    async fn handle(&self, command: DisableUser) -> Result<Vec<StoredEvent>, DomainError> {
        command_handlers::handle_disable_user(
            &command,
            self.clock.as_ref(),
            self.store.as_ref(),
            self.publisher.as_ref(),
        )
        .await
    }
}

#[async_trait]
impl CommandHandler<EnableUser> for IdentityHandlers {
    #[tracing::instrument(skip_all, fields(command_type = command.command_type(), aggregate_id = %command.user_id))]
    async fn handle(&self, command: EnableUser) -> Result<Vec<StoredEvent>, DomainError> {
        command_handlers::handle_enable_user(
            &command,
            self.clock.as_ref(),
            self.store.as_ref(),
            self.publisher.as_ref(),
        )
        .await
    }
}

#[async_trait]
impl QueryHandler<CheckEmailExists> for IdentityHandlers {
    async fn handle(&self, query: CheckEmailExists) -> Result<bool, DomainError> {
        query_handlers::handle_check_email_exists(&query, self.directory.as_ref()).await
    }
}

#[async_trait]
impl QueryHandler<CheckUsernameExists> for IdentityHandlers {
    async fn handle(&self, query: CheckUsernameExists) -> Result<bool, DomainError> {
        query_handlers::handle_check_username_exists(&query, self.directory.as_ref()).await
    }
}

#[async_trait]
impl QueryHandler<GetUserById> for IdentityHandlers {
    #[tracing::instrument(skip_all, fields(aggregate_id = %query.user_id))]
    async fn handle(&self, query: GetUserById) -> Result<UserView, DomainError> {
        query_handlers::handle_get_user_by_id(&query, self.store.as_ref()).await
    }
}
