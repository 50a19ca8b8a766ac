//! Queries for the identity context.

use chrono::{DateTime, Utc};
use gatekeeper_core::identifier::Identifier;
use gatekeeper_core::query::Query;
use serde::Serialize;

/// Read-only view of a user aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserView {
    /// The user identifier.
    pub user_id: Identifier,
    /// Current username.
    pub username: String,
    /// Current email address.
    pub email: String,
    /// Whether the account is enabled.
    pub enabled: bool,
    /// Reason for the current disablement, if any.
    pub disabled_reason: Option<String>,
    /// Current version (number of events in the history).
    pub version: i64,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the last event was applied.
    pub updated_at: DateTime<Utc>,
}

/// Asks whether an email address is already registered.
#[derive(Debug, Clone)]
pub struct CheckEmailExists {
    /// The address to look up.
    pub email: String,
}

impl Query for CheckEmailExists {
    type Output = bool;

    fn query_type(&self) -> &'static str {
        "identity.check_email_exists"
    }
}

/// Asks whether a username is already registered.
#[derive(Debug, Clone)]
pub struct CheckUsernameExists {
    /// The username to look up.
    pub username: String,
}

impl Query for CheckUsernameExists {
    type Output = bool;

    fn query_type(&self) -> &'static str {
        "identity.check_username_exists"
    }
}

/// Loads the current state of a user.
#[derive(Debug, Clone)]
pub struct GetUserById {
    /// The user to load.
    pub user_id: Identifier,
}

impl Query for GetUserById {
    type Output = UserView;

    fn query_type(&self) -> &'static str {
        "identity.get_user_by_id"
    }
}
