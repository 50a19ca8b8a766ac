//! Commands for the identity context.
//!
//! Commands carry raw client input; handlers turn it into value objects, so
//! a malformed field fails with `DomainError::Validation` at dispatch.

use std::fmt;

use gatekeeper_core::command::Command;
use gatekeeper_core::identifier::Identifier;
use gatekeeper_core::store::StoredEvent;
use uuid::Uuid;

/// Command to register a new user.
#[derive(Clone)]
pub struct CreateUser {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Requested username.
    pub username: String,
    /// Requested email address.
    pub email: String,
    /// Plain-text password, handed only to the user directory.
    pub password: String,
}

impl fmt::Debug for CreateUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateUser")
            .field("correlation_id", &self.correlation_id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"********")
            .finish()
    }
}

impl Command for CreateUser {
    type Output = Identifier;

    fn command_type(&self) -> &'static str {
        "identity.create_user"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to change a user's email address.
#[derive(Debug, Clone)]
pub struct ChangeEmail {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The user to change.
    pub user_id: Identifier,
    /// The new email address.
    pub new_email: String,
}

impl Command for ChangeEmail {
    type Output = Vec<StoredEvent>;

    fn command_type(&self) -> &'static str {
        "identity.change_email"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to change a user's username.
#[derive(Debug, Clone)]
pub struct ChangeUsername {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The user to change.
    pub user_id: Identifier,
    /// The new username.
    pub new_username: String,
}

impl Command for ChangeUsername {
    type Output = Vec<StoredEvent>;

    fn command_type(&self) -> &'static str {
        "identity.change_username"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to disable a user account.
#[derive(Debug, Clone)]
pub struct DisableUser {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The user to disable.
    pub user_id: Identifier,
    /// Why the account is disabled.
    pub reason: String,
}

impl Command for DisableUser {
    type Output = Vec<StoredEvent>;

    fn command_type(&self) -> &'static str {
        "identity.disable_user"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to enable a user account.
#[derive(Debug, Clone)]
pub struct EnableUser {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The user to enable.
    pub user_id: Identifier,
}

impl Command for EnableUser {
    type Output = Vec<StoredEvent>;

    fn command_type(&self) -> &'static str {
        "identity.enable_user"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
