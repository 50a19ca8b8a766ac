//! Aggregate roots for the identity context.

use chrono::{DateTime, Utc};
use gatekeeper_core::aggregate::AggregateRoot;
use gatekeeper_core::clock::Clock;
use gatekeeper_core::error::DomainError;
use gatekeeper_core::identifier::Identifier;
use uuid::Uuid;

use super::events::{
    EmailChanged, UserCreated, UserDisabled, UserEnabled, UserEvent, UserEventKind,
    UsernameChanged,
};
use super::value_objects::{Email, Username};

/// The aggregate root for a user account.
///
/// Only [`UserFactory`](super::factory::UserFactory) builds instances. Two
/// users are equal when their ids are equal, whatever their state.
#[derive(Debug, Clone)]
pub struct User {
    id: Identifier,
    username: Username,
    email: Email,
    enabled: bool,
    disabled_reason: Option<String>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    uncommitted_events: Vec<UserEvent>,
}

impl User {
    fn initial(id: Identifier, username: Username, email: Email, at: DateTime<Utc>) -> Self {
        Self {
            id,
            username,
            email,
            enabled: true,
            disabled_reason: None,
            version: 0,
            created_at: at,
            updated_at: at,
            uncommitted_events: Vec::new(),
        }
    }

    /// Registers a new user under a fresh id by applying its `UserCreated`
    /// event at version 1.
    pub(crate) fn register(
        username: Username,
        email: Email,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Self {
        let id = Identifier::generate();
        let now = clock.now();
        let mut user = Self::initial(id, username.clone(), email.clone(), now);
        user.apply_event(UserEvent::new(
            UserEventKind::UserCreated(UserCreated { username, email }),
            id,
            1,
            correlation_id,
            now,
        ));
        user
    }

    /// Builds a user from a historical creation event and applies it.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::MissingCreationEvent` if `event` is not
    /// `UserCreated` and `DomainError::CorruptHistory` if it is not at
    /// version 1.
    pub(crate) fn from_creation(event: UserEvent) -> Result<Self, DomainError> {
        let UserEventKind::UserCreated(created) = &event.kind else {
            return Err(DomainError::MissingCreationEvent);
        };
        if event.metadata.version != 1 {
            return Err(DomainError::CorruptHistory {
                aggregate_id: event.metadata.aggregate_id,
                version: event.metadata.version,
                reason: "creation event must be at version 1".into(),
            });
        }
        let mut user = Self::initial(
            event.metadata.aggregate_id,
            created.username.clone(),
            created.email.clone(),
            event.metadata.occurred_at,
        );
        user.apply_event(event);
        Ok(user)
    }

    /// Returns the current username.
    #[must_use]
    pub fn username(&self) -> &Username {
        &self.username
    }

    /// Returns the current email address.
    #[must_use]
    pub fn email(&self) -> &Email {
        &self.email
    }

    /// Returns `true` unless the account is disabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the reason given when the account was last disabled, while it
    /// stays disabled.
    #[must_use]
    pub fn disabled_reason(&self) -> Option<&str> {
        self.disabled_reason.as_deref()
    }

    /// Returns the timestamp of the creation event.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Changes the email address, producing an `EmailChanged` event.
    /// Setting the current address again is a no-op.
    pub fn change_email(&mut self, new_email: Email, correlation_id: Uuid, clock: &dyn Clock) {
        self.record(
            UserEventKind::EmailChanged(EmailChanged { new_email }),
            correlation_id,
            clock,
        );
    }

    /// Changes the username, producing a `UsernameChanged` event.
    /// Setting the current username again is a no-op.
    pub fn change_username(
        &mut self,
        new_username: Username,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) {
        self.record(
            UserEventKind::UsernameChanged(UsernameChanged { new_username }),
            correlation_id,
            clock,
        );
    }

    /// Disables the account, producing a `UserDisabled` event. No-op if the
    /// account is already disabled.
    pub fn disable(&mut self, reason: impl Into<String>, correlation_id: Uuid, clock: &dyn Clock) {
        self.record(
            UserEventKind::UserDisabled(UserDisabled {
                reason: reason.into(),
            }),
            correlation_id,
            clock,
        );
    }

    /// Enables the account, producing a `UserEnabled` event. No-op if the
    /// account is already enabled.
    pub fn enable(&mut self, correlation_id: Uuid, clock: &dyn Clock) {
        self.record(UserEventKind::UserEnabled(UserEnabled), correlation_id, clock);
    }

    /// Folds a historical event through the same rules as live mutation.
    ///
    /// A historical event that live mutation would have treated as a no-op
    /// leaves the domain fields untouched; `version` and `updated_at` still
    /// follow it so the expected version stays aligned with the store.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::DuplicateCreationEvent` for a `UserCreated`
    /// event after the first, and `DomainError::CorruptHistory` for an event
    /// of another aggregate or one that does not carry the next version.
    pub(crate) fn replay(&mut self, event: UserEvent) -> Result<(), DomainError> {
        if matches!(event.kind, UserEventKind::UserCreated(_)) {
            return Err(DomainError::DuplicateCreationEvent {
                version: event.metadata.version,
            });
        }
        if event.metadata.aggregate_id != self.id {
            return Err(self.corrupt(
                event.metadata.version,
                format!("event belongs to aggregate {}", event.metadata.aggregate_id),
            ));
        }
        if event.metadata.version != self.version + 1 {
            return Err(self.corrupt(
                event.metadata.version,
                format!("expected version {}", self.version + 1),
            ));
        }
        if self.is_noop(&event.kind) {
            tracing::debug!(
                aggregate_id = %self.id,
                version = event.metadata.version,
                event_type = event.kind.event_type(),
                "skipping no-op event during replay"
            );
            self.version = event.metadata.version;
            self.updated_at = event.metadata.occurred_at;
            return Ok(());
        }
        self.apply_event(event);
        Ok(())
    }

    fn corrupt(&self, version: i64, reason: String) -> DomainError {
        DomainError::CorruptHistory {
            aggregate_id: self.id,
            version,
            reason,
        }
    }

    fn is_noop(&self, kind: &UserEventKind) -> bool {
        match kind {
            UserEventKind::UserCreated(_) => false,
            UserEventKind::EmailChanged(payload) => payload.new_email == self.email,
            UserEventKind::UsernameChanged(payload) => payload.new_username == self.username,
            UserEventKind::UserDisabled(_) => !self.enabled,
            UserEventKind::UserEnabled(_) => self.enabled,
        }
    }

    fn record(&mut self, kind: UserEventKind, correlation_id: Uuid, clock: &dyn Clock) {
        if self.is_noop(&kind) {
            return;
        }
        let event = UserEvent::new(kind, self.id, self.version + 1, correlation_id, clock.now());
        self.apply_event(event);
    }
}

impl PartialEq for User {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for User {}

impl AggregateRoot for User {
    type Event = UserEvent;

    fn aggregate_id(&self) -> Identifier {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn apply_event(&mut self, event: Self::Event) {
        match &event.kind {
            UserEventKind::UserCreated(payload) => {
                self.username = payload.username.clone();
                self.email = payload.email.clone();
            }
            UserEventKind::EmailChanged(payload) => {
                self.email = payload.new_email.clone();
            }
            UserEventKind::UsernameChanged(payload) => {
                self.username = payload.new_username.clone();
            }
            UserEventKind::UserDisabled(payload) => {
                self.enabled = false;
                self.disabled_reason = Some(payload.reason.clone());
            }
            UserEventKind::UserEnabled(_) => {
                self.enabled = true;
                self.disabled_reason = None;
            }
        }
        self.version = event.metadata.version;
        self.updated_at = event.metadata.occurred_at;
        self.uncommitted_events.push(event);
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    fn clear_uncommitted_events(&mut self) {
        self.uncommitted_events.clear();
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use gatekeeper_core::aggregate::commit;
    use gatekeeper_core::event::DomainEvent;
    use gatekeeper_test_support::{FailingEventPublisher, FixedClock, RecordingEventPublisher};

    use super::*;
    use crate::domain::factory::UserFactory;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
    }

    fn new_user(clock: &FixedClock) -> User {
        UserFactory::create(
            Username::new("alice").unwrap(),
            Email::new("alice@example.com").unwrap(),
            Uuid::new_v4(),
            clock,
        )
    }

    #[test]
    fn test_change_email_produces_email_changed_event() {
        // Arrange
        let clock = FixedClock(fixed_now());
        let mut user = new_user(&clock);
        let correlation_id = Uuid::new_v4();
        let later = FixedClock(fixed_now() + Duration::minutes(5));

        // Act
        user.change_email(Email::new("new@example.com").unwrap(), correlation_id, &later);

        // Assert
        let events = user.uncommitted_events();
        assert_eq!(events.len(), 2);

        let event = &events[1];
        assert_eq!(event.event_type(), "user.email_changed");

        let meta = event.metadata();
        assert_eq!(meta.aggregate_id, user.aggregate_id());
        assert_eq!(meta.version, 2);
        assert_eq!(meta.correlation_id, correlation_id);
        assert_eq!(meta.occurred_at, later.0);

        assert_eq!(user.email().as_str(), "new@example.com");
        assert_eq!(user.version(), 2);
        assert_eq!(user.updated_at(), later.0);
        assert_eq!(user.created_at(), fixed_now());
    }

    #[test]
    fn test_change_username_produces_username_changed_event() {
        let clock = FixedClock(fixed_now());
        let mut user = new_user(&clock);

        user.change_username(Username::new("alice2").unwrap(), Uuid::new_v4(), &clock);

        let event = &user.uncommitted_events()[1];
        match &event.kind {
            UserEventKind::UsernameChanged(payload) => {
                assert_eq!(payload.new_username.as_str(), "alice2");
            }
            other => panic!("expected UsernameChanged, got {other:?}"),
        }
        assert_eq!(user.username().as_str(), "alice2");
    }

    #[test]
    fn test_noop_mutations_produce_no_events() {
        // Arrange
        let clock = FixedClock(fixed_now());
        let mut user = new_user(&clock);

        // Act
        user.change_email(Email::new("alice@example.com").unwrap(), Uuid::new_v4(), &clock);
        user.change_username(Username::new("alice").unwrap(), Uuid::new_v4(), &clock);
        user.enable(Uuid::new_v4(), &clock);

        // Assert
        assert_eq!(user.uncommitted_events().len(), 1);
        assert_eq!(user.version(), 1);
    }

    #[test]
    fn test_disable_enable_cycle() {
        // Arrange
        let clock = FixedClock(fixed_now());
        let mut user = new_user(&clock);

        // Act
        user.disable("fraud", Uuid::new_v4(), &clock);
        user.disable("again", Uuid::new_v4(), &clock);
        user.enable(Uuid::new_v4(), &clock);
        user.enable(Uuid::new_v4(), &clock);

        // Assert
        let types: Vec<&str> = user
            .uncommitted_events()
            .iter()
            .map(DomainEvent::event_type)
            .collect();
        assert_eq!(types, vec!["user.created", "user.disabled", "user.enabled"]);
        assert!(user.is_enabled());
        assert_eq!(user.disabled_reason(), None);
        assert_eq!(user.version(), 3);
    }

    #[test]
    fn test_versions_increase_by_one_per_event() {
        let clock = FixedClock(fixed_now());
        let mut user = new_user(&clock);

        user.change_email(Email::new("b@example.com").unwrap(), Uuid::new_v4(), &clock);
        user.disable("audit", Uuid::new_v4(), &clock);
        user.change_username(Username::new("bob").unwrap(), Uuid::new_v4(), &clock);

        let versions: Vec<i64> = user
            .uncommitted_events()
            .iter()
            .map(DomainEvent::version)
            .collect();
        assert_eq!(versions, vec![1, 2, 3, 4]);
        assert_eq!(user.disabled_reason(), Some("audit"));
    }

    #[test]
    fn test_equality_is_by_id_only() {
        let clock = FixedClock(fixed_now());
        let user = new_user(&clock);
        let mut changed = user.clone();
        changed.change_email(Email::new("other@example.com").unwrap(), Uuid::new_v4(), &clock);
        let stranger = new_user(&clock);

        assert_eq!(user, changed);
        assert_ne!(user, stranger);
    }

    #[tokio::test]
    async fn test_commit_publishes_and_clears_pending_events() {
        // Arrange
        let clock = FixedClock(fixed_now());
        let mut user = new_user(&clock);
        user.disable("fraud", Uuid::new_v4(), &clock);
        let publisher = RecordingEventPublisher::<UserEvent>::new();

        // Act
        commit(&mut user, &publisher).await.unwrap();

        // Assert
        assert!(user.uncommitted_events().is_empty());
        let published: Vec<i64> = publisher.published().iter().map(DomainEvent::version).collect();
        assert_eq!(published, vec![1, 2]);
        assert_eq!(user.persisted_version(), 2);
    }

    #[tokio::test]
    async fn test_failed_commit_keeps_state_and_pending_events() {
        let clock = FixedClock(fixed_now());
        let mut user = new_user(&clock);
        user.change_email(Email::new("new@example.com").unwrap(), Uuid::new_v4(), &clock);

        let result = commit(&mut user, &FailingEventPublisher).await;

        assert!(matches!(result, Err(DomainError::Publish(_))));
        assert_eq!(user.uncommitted_events().len(), 2);
        assert_eq!(user.email().as_str(), "new@example.com");
        assert_eq!(user.version(), 2);
    }
}
