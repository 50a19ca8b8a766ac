//! In-memory user directory for tests and single-process deployments.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use gatekeeper_core::error::DomainError;
use gatekeeper_core::identifier::Identifier;

use crate::domain::directory::UserDirectory;
use crate::domain::value_objects::{Email, Password, Username};

#[derive(Debug, Clone)]
struct Account {
    username: Username,
    email: Email,
}

/// Keeps registered accounts in a map. Passwords are checked against the
/// policy on the way in and then dropped; nothing here authenticates.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    accounts: RwLock<HashMap<Identifier, Account>>,
}

impl InMemoryUserDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `user_id` has been registered.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Storage` if the lock is poisoned.
    pub fn contains(&self, user_id: Identifier) -> Result<bool, DomainError> {
        Ok(self.read()?.contains_key(&user_id))
    }

    /// Returns the number of registered accounts.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Storage` if the lock is poisoned.
    pub fn account_count(&self) -> Result<usize, DomainError> {
        Ok(self.read()?.len())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<Identifier, Account>>, DomainError> {
        self.accounts.read().map_err(|_| poisoned())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<Identifier, Account>>, DomainError> {
        self.accounts.write().map_err(|_| poisoned())
    }
}

fn poisoned() -> DomainError {
    DomainError::Storage("user directory lock poisoned".to_owned())
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn exists_by_email(&self, email: &Email) -> Result<bool, DomainError> {
        Ok(self.read()?.values().any(|a| &a.email == email))
    }

    async fn exists_by_username(&self, username: &Username) -> Result<bool, DomainError> {
        Ok(self.read()?.values().any(|a| &a.username == username))
    }

    async fn register(
        &self,
        user_id: Identifier,
        username: &Username,
        email: &Email,
        _password: &Password,
    ) -> Result<(), DomainError> {
        let mut accounts = self.write()?;
        if accounts
            .values()
            .any(|a| &a.email == email || &a.username == username)
        {
            return Err(DomainError::AlreadyExists(format!(
                "account for {username} or {email}"
            )));
        }
        accounts.insert(
            user_id,
            Account {
                username: username.clone(),
                email: email.clone(),
            },
        );
        tracing::info!(%user_id, %username, "account registered");
        Ok(())
    }

    async fn change_email(&self, user_id: Identifier, email: &Email) -> Result<(), DomainError> {
        let mut accounts = self.write()?;
        if accounts
            .iter()
            .any(|(id, a)| *id != user_id && &a.email == email)
        {
            return Err(DomainError::AlreadyExists(format!(
                "email {email} is already in use"
            )));
        }
        let account = accounts
            .get_mut(&user_id)
            .ok_or(DomainError::AggregateNotFound(user_id))?;
        account.email = email.clone();
        tracing::info!(%user_id, "account email changed");
        Ok(())
    }

    async fn change_username(
        &self,
        user_id: Identifier,
        username: &Username,
    ) -> Result<(), DomainError> {
        let mut accounts = self.write()?;
        if accounts
            .iter()
            .any(|(id, a)| *id != user_id && &a.username == username)
        {
            return Err(DomainError::AlreadyExists(format!(
                "username {username} is already in use"
            )));
        }
        let account = accounts
            .get_mut(&user_id)
            .ok_or(DomainError::AggregateNotFound(user_id))?;
        account.username = username.clone();
        tracing::info!(%user_id, %username, "account renamed");
        Ok(())
    }

    async fn remove(&self, user_id: Identifier) -> Result<(), DomainError> {
        if self.write()?.remove(&user_id).is_some() {
            tracing::info!(%user_id, "account removed");
        }
        Ok(())
    }
}
