//! `PostgreSQL` implementation of the `EventStore` port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use gatekeeper_core::error::DomainError;
use gatekeeper_core::identifier::Identifier;
use gatekeeper_core::store::{EventStore, StoredEvent};

use crate::schema::{CREATE_EVENTS_TABLE, STREAM_VERSION_CONSTRAINT};

const UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL-backed event store.
#[derive(Debug, Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    /// Creates a new `PgEventStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the events table and its indexes if they do not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Storage` if the schema cannot be applied.
    pub async fn ensure_schema(&self) -> Result<(), DomainError> {
        sqlx::raw_sql(CREATE_EVENTS_TABLE)
            .execute(&self.pool)
            .await
            .map_err(|e| storage("ensure_schema", &e))?;
        tracing::info!("event store schema ready");
        Ok(())
    }

    async fn stream_version(
        tx: &mut Transaction<'_, Postgres>,
        aggregate_id: Identifier,
    ) -> Result<i64, DomainError> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM domain_events WHERE aggregate_id = $1")
                .bind(aggregate_id.as_uuid())
                .fetch_one(&mut **tx)
                .await
                .map_err(|e| storage("stream_version", &e))?;
        Ok(version.unwrap_or(0))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    event_id: Uuid,
    aggregate_id: Uuid,
    event_type: String,
    payload: serde_json::Value,
    version: i64,
    correlation_id: Uuid,
    occurred_at: DateTime<Utc>,
}

impl From<EventRow> for StoredEvent {
    fn from(row: EventRow) -> Self {
        Self {
            event_id: Identifier::from_uuid(row.event_id),
            aggregate_id: Identifier::from_uuid(row.aggregate_id),
            event_type: row.event_type,
            payload: row.payload,
            version: row.version,
            correlation_id: row.correlation_id,
            occurred_at: row.occurred_at,
        }
    }
}

fn storage(operation: &str, err: &sqlx::Error) -> DomainError {
    tracing::error!(operation, error = %err, "event store query failed");
    DomainError::Storage(format!("{operation}: {err}"))
}

/// True only when `err` is a unique violation of the stream version
/// constraint. Other unique violations (a reused event id) are not races.
fn is_version_race(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err)
            if db_err.code().as_deref() == Some(UNIQUE_VIOLATION)
                && db_err.constraint() == Some(STREAM_VERSION_CONSTRAINT)
    )
}

#[async_trait]
impl EventStore for PgEventStore {
    #[tracing::instrument(skip(self), fields(%aggregate_id))]
    async fn get_events(&self, aggregate_id: Identifier) -> Result<Vec<StoredEvent>, DomainError> {
        let rows: Vec<EventRow> = sqlx::query_as(
            r"
            SELECT event_id, aggregate_id, event_type, payload, version, correlation_id, occurred_at
            FROM domain_events
            WHERE aggregate_id = $1
            ORDER BY version ASC
            ",
        )
        .bind(aggregate_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage("get_events", &e))?;

        Ok(rows.into_iter().map(StoredEvent::from).collect())
    }

    #[tracing::instrument(skip(self, events), fields(%aggregate_id, event_count = events.len()))]
    async fn save_events(
        &self,
        aggregate_id: Identifier,
        events: &[StoredEvent],
        expected_version: i64,
    ) -> Result<(), DomainError> {
        if events.is_empty() {
            return Ok(());
        }

        if let Some((idx, stray)) = events
            .iter()
            .enumerate()
            .find(|(_, e)| e.aggregate_id != aggregate_id)
        {
            return Err(DomainError::Validation(format!(
                "event at index {idx} belongs to aggregate {} not {aggregate_id}",
                stray.aggregate_id
            )));
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| storage("begin_transaction", &e))?;

        let actual = Self::stream_version(&mut tx, aggregate_id).await?;
        if actual != expected_version {
            tracing::warn!(
                expected = expected_version,
                actual,
                "optimistic concurrency check failed"
            );
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual,
            });
        }

        let mut last_version = expected_version;
        for (event, version) in events.iter().zip(expected_version + 1..) {
            last_version = version;
            let inserted = sqlx::query(
                r"
                INSERT INTO domain_events
                    (event_id, aggregate_id, event_type, payload, version, correlation_id, occurred_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ",
            )
            .bind(event.event_id.as_uuid())
            .bind(aggregate_id.as_uuid())
            .bind(&event.event_type)
            .bind(&event.payload)
            .bind(version)
            .bind(event.correlation_id)
            .bind(event.occurred_at)
            .execute(&mut *tx)
            .await;

            if let Err(err) = inserted {
                // A concurrent writer committed the same version after our read.
                if is_version_race(&err) {
                    drop(tx);
                    let actual = self.current_version(aggregate_id).await?;
                    tracing::warn!(
                        expected = expected_version,
                        actual,
                        "concurrent append detected"
                    );
                    return Err(DomainError::ConcurrencyConflict {
                        aggregate_id,
                        expected: expected_version,
                        actual,
                    });
                }
                return Err(storage("insert_event", &err));
            }
        }

        tx.commit()
            .await
            .map_err(|e| storage("commit_transaction", &e))?;

        tracing::info!(version = last_version, "events appended");
        Ok(())
    }

    async fn current_version(&self, aggregate_id: Identifier) -> Result<i64, DomainError> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM domain_events WHERE aggregate_id = $1")
                .bind(aggregate_id.as_uuid())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| storage("current_version", &e))?;
        Ok(version.unwrap_or(0))
    }
}
