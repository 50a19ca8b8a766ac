//! Command handlers for the identity context.
//!
//! Each handler validates its input, loads or creates the aggregate, runs
//! the domain operation, persists the new events under the aggregate's
//! expected version and only then publishes them. A publish failure after a
//! successful save is reported as `DomainError::Publish`; the events are
//! already durable at that point.
//!
//! Handlers that touch an email or username reserve it in the user
//! directory before saving and release it again if the save fails, so the
//! directory never holds values the event history does not.

use gatekeeper_core::aggregate::{AggregateRoot, commit};
use gatekeeper_core::clock::Clock;
use gatekeeper_core::error::DomainError;
use gatekeeper_core::identifier::Identifier;
use gatekeeper_core::publisher::EventPublisher;
use gatekeeper_core::store::{EventStore, StoredEvent};

use crate::domain::aggregates::User;
use crate::domain::commands::{ChangeEmail, ChangeUsername, CreateUser, DisableUser, EnableUser};
use crate::domain::directory::UserDirectory;
use crate::domain::events::UserEvent;
use crate::domain::factory::UserFactory;
use crate::domain::value_objects::{Email, Password, Username};

/// Loads and reconstitutes a user.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the user has no history,
/// `DomainError::Storage` if loading or deserialization fails.
pub(crate) async fn load_user(
    user_id: Identifier,
    store: &dyn EventStore,
) -> Result<User, DomainError> {
    let stored = store.get_events(user_id).await?;
    if stored.is_empty() {
        return Err(DomainError::AggregateNotFound(user_id));
    }
    UserFactory::reconstitute_stored(&stored)
}

/// Saves the user's pending events without publishing them.
async fn persist(user: &User, store: &dyn EventStore) -> Result<Vec<StoredEvent>, DomainError> {
    let stored_events: Vec<StoredEvent> = user
        .uncommitted_events()
        .iter()
        .map(StoredEvent::from_event)
        .collect();
    if !stored_events.is_empty() {
        store
            .save_events(user.aggregate_id(), &stored_events, user.persisted_version())
            .await?;
    }
    Ok(stored_events)
}

/// Commits already saved events to the publisher.
async fn publish(
    user: &mut User,
    publisher: &dyn EventPublisher<UserEvent>,
    stored_events: Vec<StoredEvent>,
) -> Result<Vec<StoredEvent>, DomainError> {
    if stored_events.is_empty() {
        tracing::debug!(aggregate_id = %user.aggregate_id(), "no-op, nothing to persist");
        return Ok(stored_events);
    }
    commit(user, publisher).await?;

    tracing::info!(
        aggregate_id = %user.aggregate_id(),
        version = user.version(),
        event_count = stored_events.len(),
        "user events committed"
    );
    Ok(stored_events)
}

/// Saves the user's pending events, then commits them to the publisher.
/// Returns the saved events, which is empty when the operation was a no-op.
async fn persist_and_commit(
    user: &mut User,
    store: &dyn EventStore,
    publisher: &dyn EventPublisher<UserEvent>,
) -> Result<Vec<StoredEvent>, DomainError> {
    let stored_events = persist(user, store).await?;
    publish(user, publisher, stored_events).await
}

/// Saves the user's pending events; if that fails, runs `release` to undo
/// the directory reservation and returns the save error.
async fn persist_or_release<F>(
    user: &User,
    store: &dyn EventStore,
    release: F,
) -> Result<Vec<StoredEvent>, DomainError>
where
    F: Future<Output = Result<(), DomainError>>,
{
    match persist(user, store).await {
        Ok(stored_events) => Ok(stored_events),
        Err(err) => {
            let user_id = user.aggregate_id();
            tracing::warn!(%user_id, error = %err, "save failed, releasing directory reservation");
            if let Err(release_err) = release.await {
                tracing::error!(%user_id, error = %release_err, "directory release failed");
            }
            Err(err)
        }
    }
}

async fn ensure_email_free(directory: &dyn UserDirectory, email: &Email) -> Result<(), DomainError> {
    if directory.exists_by_email(email).await? {
        return Err(DomainError::AlreadyExists(format!("email {email} is already in use")));
    }
    Ok(())
}

async fn ensure_username_free(
    directory: &dyn UserDirectory,
    username: &Username,
) -> Result<(), DomainError> {
    if directory.exists_by_username(username).await? {
        return Err(DomainError::AlreadyExists(format!(
            "username {username} is already in use"
        )));
    }
    Ok(())
}

/// Handles the `CreateUser` command: validates all fields, rejects a taken
/// email or username, registers credentials with the directory, then
/// persists and publishes the `UserCreated` event. The account is removed
/// again if the event cannot be saved.
///
/// # Errors
///
/// Returns `DomainError::Validation` for malformed input,
/// `DomainError::AlreadyExists` for a taken email or username, or whatever
/// the directory, store or publisher report.
pub async fn handle_create_user(
    command: &CreateUser,
    clock: &dyn Clock,
    store: &dyn EventStore,
    publisher: &dyn EventPublisher<UserEvent>,
    directory: &dyn UserDirectory,
) -> Result<Identifier, DomainError> {
    let username = Username::new(command.username.as_str())?;
    let email = Email::new(command.email.as_str())?;
    let password = Password::new(command.password.as_str())?;

    ensure_email_free(directory, &email).await?;
    ensure_username_free(directory, &username).await?;

    let mut user = UserFactory::create(username, email, command.correlation_id, clock);
    let user_id = user.aggregate_id();
    directory
        .register(user_id, user.username(), user.email(), &password)
        .await?;

    let stored_events = persist_or_release(&user, store, directory.remove(user_id)).await?;
    publish(&mut user, publisher, stored_events).await?;
    Ok(user_id)
}

/// Handles the `ChangeEmail` command. The new address must not belong to
/// another account; the directory follows the change.
///
/// # Errors
///
/// Returns `DomainError::Validation` for a malformed address,
/// `DomainError::AggregateNotFound` for an unknown user,
/// `DomainError::AlreadyExists` for an address another account uses, or
/// whatever the directory, store or publisher report.
pub async fn handle_change_email(
    command: &ChangeEmail,
    clock: &dyn Clock,
    store: &dyn EventStore,
    publisher: &dyn EventPublisher<UserEvent>,
    directory: &dyn UserDirectory,
) -> Result<Vec<StoredEvent>, DomainError> {
    let new_email = Email::new(command.new_email.as_str())?;
    let mut user = load_user(command.user_id, store).await?;
    let previous = user.email().clone();

    user.change_email(new_email, command.correlation_id, clock);
    if user.uncommitted_events().is_empty() {
        return publish(&mut user, publisher, Vec::new()).await;
    }

    let user_id = user.aggregate_id();
    ensure_email_free(directory, user.email()).await?;
    directory.change_email(user_id, user.email()).await?;

    let stored_events =
        persist_or_release(&user, store, directory.change_email(user_id, &previous)).await?;
    publish(&mut user, publisher, stored_events).await
}

/// Handles the `ChangeUsername` command. The new username must not belong
/// to another account; the directory follows the change.
///
/// # Errors
///
/// Returns `DomainError::Validation` for a malformed username,
/// `DomainError::AggregateNotFound` for an unknown user,
/// `DomainError::AlreadyExists` for a username another account uses, or
/// whatever the directory, store or publisher report.
pub async fn handle_change_username(
    command: &ChangeUsername,
    clock: &dyn Clock,
    store: &dyn EventStore,
    publisher: &dyn EventPublisher<UserEvent>,
    directory: &dyn UserDirectory,
) -> Result<Vec<StoredEvent>, DomainError> {
    let new_username = Username::new(command.new_username.as_str())?;
    let mut user = load_user(command.user_id, store).await?;
    let previous = user.username().clone();

    user.change_username(new_username, command.correlation_id, clock);
    if user.uncommitted_events().is_empty() {
        return publish(&mut user, publisher, Vec::new()).await;
    }

    let user_id = user.aggregate_id();
    ensure_username_free(directory, user.username()).await?;
    directory.change_username(user_id, user.username()).await?;

    let stored_events =
        persist_or_release(&user, store, directory.change_username(user_id, &previous)).await?;
    publish(&mut user, publisher, stored_events).await
}

/// Handles the `DisableUser` command.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` for an unknown user, or
/// whatever the store or publisher report.
pub async fn handle_disable_user(
    command: &DisableUser,
    clock: &dyn Clock,
    store: &dyn EventStore,
    publisher: &dyn EventPublisher<UserEvent>,
) -> Result<Vec<StoredEvent>, DomainError> {
    let mut user = load_user(command.user_id, store).await?;

    user.disable(command.reason.as_str(), command.correlation_id, clock);

    persist_and_commit(&mut user, store, publisher).await
}

/// Handles the `EnableUser` command.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` for an unknown user, or
/// whatever the store or publisher report.
pub async fn handle_enable_user(
    command: &EnableUser,
    clock: &dyn Clock,
    store: &dyn EventStore,
    publisher: &dyn EventPublisher<UserEvent>,
) -> Result<Vec<StoredEvent>, DomainError> {
    let mut user = load_user(command.user_id, store).await?;

    user.enable(command.correlation_id, clock);

    persist_and_commit(&mut user, store, publisher).await
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use gatekeeper_core::event::DomainEvent;
    use gatekeeper_test_support::{
        ConflictingEventStore, EmptyEventStore, FailingEventPublisher, FailingEventStore,
        FixedClock, RecordingEventPublisher, RecordingEventStore,
    };
    use uuid::Uuid;

    use super::*;
    use crate::infrastructure::InMemoryUserDirectory;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
    }

    fn create_command() -> CreateUser {
        CreateUser {
            correlation_id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            password: "Secr3t!pass".into(),
        }
    }

    /// History of a freshly created user, as the store would return it.
    fn created_history(clock: &FixedClock) -> (Identifier, Vec<StoredEvent>) {
        let user = UserFactory::create(
            Username::new("alice").unwrap(),
            Email::new("alice@example.com").unwrap(),
            Uuid::new_v4(),
            clock,
        );
        let stored = user
            .uncommitted_events()
            .iter()
            .map(StoredEvent::from_event)
            .collect();
        (user.aggregate_id(), stored)
    }

    /// A directory that already holds the account of `user_id` as alice.
    async fn directory_with_alice(user_id: Identifier) -> InMemoryUserDirectory {
        let directory = InMemoryUserDirectory::new();
        directory
            .register(
                user_id,
                &Username::new("alice").unwrap(),
                &Email::new("alice@example.com").unwrap(),
                &Password::new("Secr3t!pass").unwrap(),
            )
            .await
            .unwrap();
        directory
    }

    #[tokio::test]
    async fn test_handle_create_user_persists_and_publishes_user_created() {
        // Arrange
        let clock = FixedClock(fixed_now());
        let store = RecordingEventStore::new(Vec::new());
        let publisher = RecordingEventPublisher::<UserEvent>::new();
        let directory = InMemoryUserDirectory::new();
        let command = create_command();

        // Act
        let user_id = handle_create_user(&command, &clock, &store, &publisher, &directory)
            .await
            .unwrap();

        // Assert
        let saved = store.saved_events();
        assert_eq!(saved.len(), 1);

        let (agg_id, expected_version, events) = &saved[0];
        assert_eq!(*agg_id, user_id);
        assert_eq!(*expected_version, 0);
        assert_eq!(events.len(), 1);

        let stored = &events[0];
        assert_eq!(stored.event_type, "user.created");
        assert_eq!(stored.aggregate_id, user_id);
        assert_eq!(stored.version, 1);
        assert_eq!(stored.correlation_id, command.correlation_id);
        assert_eq!(stored.occurred_at, fixed_now());

        let published = publisher.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].event_type(), "user.created");
        assert!(directory.contains(user_id).unwrap());
    }

    #[tokio::test]
    async fn test_handle_create_user_rejects_taken_email() {
        // Arrange
        let clock = FixedClock(fixed_now());
        let directory = InMemoryUserDirectory::new();
        let publisher = RecordingEventPublisher::<UserEvent>::new();
        handle_create_user(&create_command(), &clock, &EmptyEventStore, &publisher, &directory)
            .await
            .unwrap();
        let store = RecordingEventStore::new(Vec::new());
        let command = CreateUser {
            username: "alice2".into(),
            ..create_command()
        };

        // Act
        let result = handle_create_user(&command, &clock, &store, &publisher, &directory).await;

        // Assert
        match result {
            Err(DomainError::AlreadyExists(msg)) => assert!(msg.contains("email")),
            other => panic!("expected AlreadyExists, got {other:?}"),
        }
        assert!(store.saved_events().is_empty());
    }

    #[tokio::test]
    async fn test_handle_create_user_rejects_taken_username() {
        let clock = FixedClock(fixed_now());
        let directory = InMemoryUserDirectory::new();
        let publisher = RecordingEventPublisher::<UserEvent>::new();
        handle_create_user(&create_command(), &clock, &EmptyEventStore, &publisher, &directory)
            .await
            .unwrap();
        let command = CreateUser {
            email: "other@example.com".into(),
            ..create_command()
        };

        let result =
            handle_create_user(&command, &clock, &EmptyEventStore, &publisher, &directory).await;

        match result {
            Err(DomainError::AlreadyExists(msg)) => assert!(msg.contains("username")),
            other => panic!("expected AlreadyExists, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_handle_create_user_validates_every_field() {
        let clock = FixedClock(fixed_now());
        let directory = InMemoryUserDirectory::new();
        let publisher = RecordingEventPublisher::<UserEvent>::new();
        let invalid = [
            CreateUser {
                username: "a".into(),
                ..create_command()
            },
            CreateUser {
                email: "nope".into(),
                ..create_command()
            },
            CreateUser {
                password: "weak".into(),
                ..create_command()
            },
        ];

        for command in &invalid {
            let result =
                handle_create_user(command, &clock, &EmptyEventStore, &publisher, &directory)
                    .await;
            assert!(matches!(result, Err(DomainError::Validation(_))));
        }
        assert_eq!(directory.account_count().unwrap(), 0);
        assert!(publisher.published().is_empty());
    }

    #[tokio::test]
    async fn test_handle_change_email_persists_email_changed_event() {
        // Arrange
        let clock = FixedClock(fixed_now());
        let (user_id, history) = created_history(&clock);
        let store = RecordingEventStore::new(history);
        let publisher = RecordingEventPublisher::<UserEvent>::new();
        let directory = directory_with_alice(user_id).await;
        let command = ChangeEmail {
            correlation_id: Uuid::new_v4(),
            user_id,
            new_email: "new@example.com".into(),
        };

        // Act
        let events = handle_change_email(&command, &clock, &store, &publisher, &directory)
            .await
            .unwrap();

        // Assert
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "user.email_changed");
        assert_eq!(events[0].version, 2);
        assert_eq!(events[0].correlation_id, command.correlation_id);

        let saved = store.saved_events();
        assert_eq!(saved.len(), 1);
        let (agg_id, expected_version, _) = &saved[0];
        assert_eq!(*agg_id, user_id);
        assert_eq!(*expected_version, 1);
        assert_eq!(publisher.published().len(), 1);

        let old_email = Email::new("alice@example.com").unwrap();
        let new_email = Email::new("new@example.com").unwrap();
        assert!(!directory.exists_by_email(&old_email).await.unwrap());
        assert!(directory.exists_by_email(&new_email).await.unwrap());
    }

    #[tokio::test]
    async fn test_noop_command_saves_and_publishes_nothing() {
        let clock = FixedClock(fixed_now());
        let (user_id, history) = created_history(&clock);
        let store = RecordingEventStore::new(history);
        let publisher = RecordingEventPublisher::<UserEvent>::new();
        let directory = directory_with_alice(user_id).await;

        let events = handle_change_username(
            &ChangeUsername {
                correlation_id: Uuid::new_v4(),
                user_id,
                new_username: "alice".into(),
            },
            &clock,
            &store,
            &publisher,
            &directory,
        )
        .await
        .unwrap();

        assert!(events.is_empty());
        assert!(store.saved_events().is_empty());
        assert!(publisher.published().is_empty());
    }

    #[tokio::test]
    async fn test_handle_disable_and_enable_user() {
        let clock = FixedClock(fixed_now());
        let (user_id, history) = created_history(&clock);
        let store = RecordingEventStore::new(history);
        let publisher = RecordingEventPublisher::<UserEvent>::new();

        let disabled = handle_disable_user(
            &DisableUser {
                correlation_id: Uuid::new_v4(),
                user_id,
                reason: "fraud".into(),
            },
            &clock,
            &store,
            &publisher,
        )
        .await
        .unwrap();
        // The recording store keeps returning the creation-only history, so
        // the user is enabled again when EnableUser loads it.
        let enabled = handle_enable_user(
            &EnableUser {
                correlation_id: Uuid::new_v4(),
                user_id,
            },
            &clock,
            &store,
            &publisher,
        )
        .await
        .unwrap();

        assert_eq!(disabled[0].event_type, "user.disabled");
        assert_eq!(disabled[0].payload["UserDisabled"]["reason"], "fraud");
        assert!(enabled.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let clock = FixedClock(fixed_now());
        let publisher = RecordingEventPublisher::<UserEvent>::new();
        let user_id = Identifier::generate();

        let result = handle_enable_user(
            &EnableUser {
                correlation_id: Uuid::new_v4(),
                user_id,
            },
            &clock,
            &EmptyEventStore,
            &publisher,
        )
        .await;

        match result {
            Err(DomainError::AggregateNotFound(id)) => assert_eq!(id, user_id),
            other => panic!("expected AggregateNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_store_failure_is_propagated_and_nothing_published() {
        let clock = FixedClock(fixed_now());
        let publisher = RecordingEventPublisher::<UserEvent>::new();

        let result = handle_disable_user(
            &DisableUser {
                correlation_id: Uuid::new_v4(),
                user_id: Identifier::generate(),
                reason: "fraud".into(),
            },
            &clock,
            &FailingEventStore,
            &publisher,
        )
        .await;

        assert!(matches!(result, Err(DomainError::Storage(_))));
        assert!(publisher.published().is_empty());
    }

    #[tokio::test]
    async fn test_publish_failure_after_save_is_reported() {
        let clock = FixedClock(fixed_now());
        let (user_id, history) = created_history(&clock);
        let store = RecordingEventStore::new(history);

        let result = handle_disable_user(
            &DisableUser {
                correlation_id: Uuid::new_v4(),
                user_id,
                reason: "fraud".into(),
            },
            &clock,
            &store,
            &FailingEventPublisher,
        )
        .await;

        assert!(matches!(result, Err(DomainError::Publish(_))));
        assert_eq!(store.saved_events().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_save_releases_registration_so_retry_succeeds() {
        // Arrange
        let clock = FixedClock(fixed_now());
        let publisher = RecordingEventPublisher::<UserEvent>::new();
        let directory = InMemoryUserDirectory::new();
        let command = create_command();

        // Act
        let failed =
            handle_create_user(&command, &clock, &FailingEventStore, &publisher, &directory).await;
        let accounts_after_failure = directory.account_count().unwrap();
        let retried =
            handle_create_user(&command, &clock, &EmptyEventStore, &publisher, &directory).await;

        // Assert
        assert!(matches!(failed, Err(DomainError::Storage(_))));
        assert_eq!(accounts_after_failure, 0);
        let user_id = retried.unwrap();
        assert!(directory.contains(user_id).unwrap());
        assert_eq!(publisher.published().len(), 1);
    }

    #[tokio::test]
    async fn test_change_email_to_another_users_address_is_rejected() {
        // Arrange
        let clock = FixedClock(fixed_now());
        let (alice_id, history) = created_history(&clock);
        let store = RecordingEventStore::new(history);
        let publisher = RecordingEventPublisher::<UserEvent>::new();
        let directory = directory_with_alice(alice_id).await;
        directory
            .register(
                Identifier::generate(),
                &Username::new("bob").unwrap(),
                &Email::new("bob@example.com").unwrap(),
                &Password::new("Secr3t!pass").unwrap(),
            )
            .await
            .unwrap();
        let command = ChangeEmail {
            correlation_id: Uuid::new_v4(),
            user_id: alice_id,
            new_email: "bob@example.com".into(),
        };

        // Act
        let result = handle_change_email(&command, &clock, &store, &publisher, &directory).await;

        // Assert
        match result {
            Err(DomainError::AlreadyExists(msg)) => assert!(msg.contains("email")),
            other => panic!("expected AlreadyExists, got {other:?}"),
        }
        assert!(store.saved_events().is_empty());
        assert!(publisher.published().is_empty());
        let alice_email = Email::new("alice@example.com").unwrap();
        assert!(directory.exists_by_email(&alice_email).await.unwrap());
    }

    #[tokio::test]
    async fn test_change_username_to_another_users_name_is_rejected() {
        let clock = FixedClock(fixed_now());
        let (alice_id, history) = created_history(&clock);
        let store = RecordingEventStore::new(history);
        let publisher = RecordingEventPublisher::<UserEvent>::new();
        let directory = directory_with_alice(alice_id).await;
        directory
            .register(
                Identifier::generate(),
                &Username::new("bob").unwrap(),
                &Email::new("bob@example.com").unwrap(),
                &Password::new("Secr3t!pass").unwrap(),
            )
            .await
            .unwrap();

        let result = handle_change_username(
            &ChangeUsername {
                correlation_id: Uuid::new_v4(),
                user_id: alice_id,
                new_username: "bob".into(),
            },
            &clock,
            &store,
            &publisher,
            &directory,
        )
        .await;

        match result {
            Err(DomainError::AlreadyExists(msg)) => assert!(msg.contains("username")),
            other => panic!("expected AlreadyExists, got {other:?}"),
        }
        assert!(store.saved_events().is_empty());
    }

    #[tokio::test]
    async fn test_change_username_rolls_directory_back_when_save_fails() {
        // Arrange
        let clock = FixedClock(fixed_now());
        let (user_id, history) = created_history(&clock);
        let store = ConflictingEventStore::new(history);
        let directory = directory_with_alice(user_id).await;
        let publisher = RecordingEventPublisher::<UserEvent>::new();
        let command = ChangeUsername {
            correlation_id: Uuid::new_v4(),
            user_id,
            new_username: "alice2".into(),
        };

        // Act
        let result =
            handle_change_username(&command, &clock, &store, &publisher, &directory).await;

        // Assert
        assert!(matches!(result, Err(DomainError::ConcurrencyConflict { .. })));
        assert!(publisher.published().is_empty());
        let alice = Username::new("alice").unwrap();
        let alice2 = Username::new("alice2").unwrap();
        assert!(directory.exists_by_username(&alice).await.unwrap());
        assert!(!directory.exists_by_username(&alice2).await.unwrap());
    }

    #[tokio::test]
    async fn test_change_email_rolls_directory_back_when_save_fails() {
        let clock = FixedClock(fixed_now());
        let (user_id, history) = created_history(&clock);
        let store = ConflictingEventStore::new(history);
        let directory = directory_with_alice(user_id).await;
        let publisher = RecordingEventPublisher::<UserEvent>::new();

        let result = handle_change_email(
            &ChangeEmail {
                correlation_id: Uuid::new_v4(),
                user_id,
                new_email: "alice@new.example.com".into(),
            },
            &clock,
            &store,
            &publisher,
            &directory,
        )
        .await;

        assert!(matches!(result, Err(DomainError::ConcurrencyConflict { .. })));
        let old_email = Email::new("alice@example.com").unwrap();
        let new_email = Email::new("alice@new.example.com").unwrap();
        assert!(directory.exists_by_email(&old_email).await.unwrap());
        assert!(!directory.exists_by_email(&new_email).await.unwrap());
    }
}
