//! Query handlers for the identity context.
//!
//! This module contains query handlers that reconstitute aggregates from
//! stored events or ask the user directory, and return read-only answers.

use gatekeeper_core::aggregate::AggregateRoot;
use gatekeeper_core::error::DomainError;
use gatekeeper_core::store::EventStore;

use crate::application::command_handlers::load_user;
use crate::domain::directory::UserDirectory;
use crate::domain::queries::{CheckEmailExists, CheckUsernameExists, GetUserById, UserView};
use crate::domain::value_objects::{Email, Username};

/// Answers whether an email address is taken.
///
/// # Errors
///
/// Returns `DomainError::Validation` for a malformed address, otherwise
/// whatever the directory reports.
pub async fn handle_check_email_exists(
    query: &CheckEmailExists,
    directory: &dyn UserDirectory,
) -> Result<bool, DomainError> {
    let email = Email::new(query.email.as_str())?;
    directory.exists_by_email(&email).await
}

/// Answers whether a username is taken.
///
/// # Errors
///
/// Returns `DomainError::Validation` for a malformed username, otherwise
/// whatever the directory reports.
pub async fn handle_check_username_exists(
    query: &CheckUsernameExists,
    directory: &dyn UserDirectory,
) -> Result<bool, DomainError> {
    let username = Username::new(query.username.as_str())?;
    directory.exists_by_username(&username).await
}

/// Retrieves a user by its aggregate ID.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if no events exist for the ID.
/// Returns `DomainError::Storage` if event loading or deserialization fails.
pub async fn handle_get_user_by_id(
    query: &GetUserById,
    store: &dyn EventStore,
) -> Result<UserView, DomainError> {
    let user = load_user(query.user_id, store).await?;
    Ok(UserView {
        user_id: user.aggregate_id(),
        username: user.username().to_string(),
        email: user.email().to_string(),
        enabled: user.is_enabled(),
        disabled_reason: user.disabled_reason().map(str::to_owned),
        version: user.version(),
        created_at: user.created_at(),
        updated_at: user.updated_at(),
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use gatekeeper_core::identifier::Identifier;
    use gatekeeper_core::store::StoredEvent;
    use gatekeeper_test_support::{EmptyEventStore, FixedClock, RecordingEventStore};
    use uuid::Uuid;

    use super::*;
    use crate::domain::factory::UserFactory;
    use crate::domain::value_objects::Password;
    use crate::infrastructure::InMemoryUserDirectory;

    #[tokio::test]
    async fn test_get_user_by_id_returns_view_with_state() {
        // Arrange
        let fixed_now = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        let later = FixedClock(fixed_now + Duration::minutes(10));
        let mut user = UserFactory::create(
            Username::new("alice").unwrap(),
            Email::new("alice@example.com").unwrap(),
            Uuid::new_v4(),
            &FixedClock(fixed_now),
        );
        user.disable("fraud", Uuid::new_v4(), &later);
        let history: Vec<StoredEvent> = user
            .uncommitted_events()
            .iter()
            .map(StoredEvent::from_event)
            .collect();
        let store = RecordingEventStore::new(history);

        // Act
        let view = handle_get_user_by_id(
            &GetUserById {
                user_id: user.aggregate_id(),
            },
            &store,
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(view.user_id, user.aggregate_id());
        assert_eq!(view.username, "alice");
        assert_eq!(view.email, "alice@example.com");
        assert!(!view.enabled);
        assert_eq!(view.disabled_reason.as_deref(), Some("fraud"));
        assert_eq!(view.version, 2);
        assert_eq!(view.created_at, fixed_now);
        assert_eq!(view.updated_at, later.0);
    }

    #[tokio::test]
    async fn test_get_user_by_id_returns_not_found_when_no_events() {
        // Arrange
        let user_id = Identifier::generate();

        // Act
        let result = handle_get_user_by_id(&GetUserById { user_id }, &EmptyEventStore).await;

        // Assert
        match result {
            Err(DomainError::AggregateNotFound(id)) => assert_eq!(id, user_id),
            other => panic!("expected AggregateNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_existence_checks_consult_the_directory() {
        // Arrange
        let directory = InMemoryUserDirectory::new();
        directory
            .register(
                Identifier::generate(),
                &Username::new("alice").unwrap(),
                &Email::new("alice@example.com").unwrap(),
                &Password::new("Secr3t!pass").unwrap(),
            )
            .await
            .unwrap();

        // Act
        let email_taken = handle_check_email_exists(
            &CheckEmailExists {
                email: "alice@example.com".into(),
            },
            &directory,
        )
        .await
        .unwrap();
        let username_free = handle_check_username_exists(
            &CheckUsernameExists {
                username: "bob".into(),
            },
            &directory,
        )
        .await
        .unwrap();

        // Assert
        assert!(email_taken);
        assert!(!username_free);
    }

    #[tokio::test]
    async fn test_existence_check_rejects_malformed_input() {
        let directory = InMemoryUserDirectory::new();

        let result = handle_check_email_exists(
            &CheckEmailExists {
                email: "not-an-email".into(),
            },
            &directory,
        )
        .await;

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }
}
