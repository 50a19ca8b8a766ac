//! User directory port.
//!
//! The directory is the identity provider that owns credentials and answers
//! uniqueness questions. The event history stays the source of truth for
//! user state; the directory mirrors each account's current email and
//! username so its answers track renames.

use async_trait::async_trait;
use gatekeeper_core::error::DomainError;
use gatekeeper_core::identifier::Identifier;

use super::value_objects::{Email, Password, Username};

/// Port to the external identity provider.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Returns `true` if an account already uses `email`.
    async fn exists_by_email(&self, email: &Email) -> Result<bool, DomainError>;

    /// Returns `true` if an account already uses `username`.
    async fn exists_by_username(&self, username: &Username) -> Result<bool, DomainError>;

    /// Stores credentials for a newly created user.
    async fn register(
        &self,
        user_id: Identifier,
        username: &Username,
        email: &Email,
        password: &Password,
    ) -> Result<(), DomainError>;

    /// Moves the account of `user_id` to `email`.
    ///
    /// Fails with `DomainError::AlreadyExists` if another account uses
    /// `email` and with `DomainError::AggregateNotFound` if `user_id` has no
    /// account.
    async fn change_email(&self, user_id: Identifier, email: &Email) -> Result<(), DomainError>;

    /// Renames the account of `user_id` to `username`.
    ///
    /// Fails with `DomainError::AlreadyExists` if another account uses
    /// `username` and with `DomainError::AggregateNotFound` if `user_id` has
    /// no account.
    async fn change_username(
        &self,
        user_id: Identifier,
        username: &Username,
    ) -> Result<(), DomainError>;

    /// Deletes the account of `user_id`. Unknown ids are ignored.
    async fn remove(&self, user_id: Identifier) -> Result<(), DomainError>;
}
