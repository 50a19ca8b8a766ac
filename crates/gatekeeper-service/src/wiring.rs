//! Explicit handler registry.

use gatekeeper_core::dispatcher::Dispatcher;
use gatekeeper_core::error::DomainError;
use gatekeeper_identity::application::handlers::IdentityHandlers;

/// Builds the dispatcher with every handler the service serves.
///
/// # Errors
///
/// Returns `DomainError::DuplicateHandler` if two registrations target the
/// same request type.
pub fn build_dispatcher(identity: IdentityHandlers) -> Result<Dispatcher, DomainError> {
    let dispatcher = identity.register(Dispatcher::builder())?.build();
    tracing::info!(?dispatcher, "handlers registered");
    Ok(dispatcher)
}
