//! In-process command/query dispatcher.
//!
//! Handlers are registered once, at startup, through an explicit
//! [`DispatcherBuilder`] chain. Each request type maps to exactly one
//! handler, keyed by its `TypeId`; dispatch is a single lookup followed by
//! the handler call, with no retries and no business logic.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::command::{Command, CommandHandler};
use crate::error::DomainError;
use crate::query::{Query, QueryHandler};

type BoxedHandler = Box<dyn Any + Send + Sync>;

/// Collects handler registrations before the dispatcher is frozen.
#[derive(Default)]
pub struct DispatcherBuilder {
    commands: HashMap<TypeId, BoxedHandler>,
    queries: HashMap<TypeId, BoxedHandler>,
}

impl DispatcherBuilder {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the handler for command type `C`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::DuplicateHandler` if `C` already has a handler.
    pub fn command<C, H>(mut self, handler: H) -> Result<Self, DomainError>
    where
        C: Command,
        H: CommandHandler<C> + 'static,
    {
        let handler: Arc<dyn CommandHandler<C>> = Arc::new(handler);
        if self
            .commands
            .insert(TypeId::of::<C>(), Box::new(handler))
            .is_some()
        {
            return Err(DomainError::DuplicateHandler(type_name::<C>()));
        }
        Ok(self)
    }

    /// Registers the handler for query type `Q`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::DuplicateHandler` if `Q` already has a handler.
    pub fn query<Q, H>(mut self, handler: H) -> Result<Self, DomainError>
    where
        Q: Query,
        H: QueryHandler<Q> + 'static,
    {
        let handler: Arc<dyn QueryHandler<Q>> = Arc::new(handler);
        if self
            .queries
            .insert(TypeId::of::<Q>(), Box::new(handler))
            .is_some()
        {
            return Err(DomainError::DuplicateHandler(type_name::<Q>()));
        }
        Ok(self)
    }

    /// Freezes the registry.
    #[must_use]
    pub fn build(self) -> Dispatcher {
        tracing::debug!(
            commands = self.commands.len(),
            queries = self.queries.len(),
            "dispatcher registry built"
        );
        Dispatcher {
            commands: self.commands,
            queries: self.queries,
        }
    }
}

/// Routes commands and queries to their registered handler.
pub struct Dispatcher {
    commands: HashMap<TypeId, BoxedHandler>,
    queries: HashMap<TypeId, BoxedHandler>,
}

impl Dispatcher {
    /// Starts a new registration chain.
    #[must_use]
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Dispatches a command and returns the handler's result unchanged.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NoHandlerRegistered` if no handler exists for
    /// `C`, otherwise whatever the handler returns.
    #[tracing::instrument(skip_all, fields(command_type = command.command_type(), correlation_id = %command.correlation_id()))]
    pub async fn dispatch<C: Command>(&self, command: C) -> Result<C::Output, DomainError> {
        let Some(handler) = self
            .commands
            .get(&TypeId::of::<C>())
            .and_then(|boxed| boxed.downcast_ref::<Arc<dyn CommandHandler<C>>>())
            .map(Arc::clone)
        else {
            tracing::error!("no command handler registered");
            return Err(DomainError::NoHandlerRegistered(command.command_type()));
        };

        handler.handle(command).await
    }

    /// Dispatches a query and returns the handler's result unchanged.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NoHandlerRegistered` if no handler exists for
    /// `Q`, otherwise whatever the handler returns.
    #[tracing::instrument(skip_all, fields(query_type = query.query_type()))]
    pub async fn dispatch_query<Q: Query>(&self, query: Q) -> Result<Q::Output, DomainError> {
        let Some(handler) = self
            .queries
            .get(&TypeId::of::<Q>())
            .and_then(|boxed| boxed.downcast_ref::<Arc<dyn QueryHandler<Q>>>())
            .map(Arc::clone)
        else {
            tracing::error!("no query handler registered");
            return Err(DomainError::NoHandlerRegistered(query.query_type()));
        };

        handler.handle(query).await
    }

    /// Returns `true` if a handler is registered for command type `C`.
    #[must_use]
    pub fn handles_command<C: Command>(&self) -> bool {
        self.commands.contains_key(&TypeId::of::<C>())
    }

    /// Returns `true` if a handler is registered for query type `Q`.
    #[must_use]
    pub fn handles_query<Q: Query>(&self) -> bool {
        self.queries.contains_key(&TypeId::of::<Q>())
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("commands", &self.commands.len())
            .field("queries", &self.queries.len())
            .finish()
    }
}
