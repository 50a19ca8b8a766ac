//! Event store database schema.

/// SQL to create the events table.
///
/// [`STREAM_VERSION_CONSTRAINT`] is the last line of defence for the
/// optimistic concurrency check: two writers racing on the same expected
/// version cannot both insert the next version.
pub const CREATE_EVENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS domain_events (
    event_id        UUID NOT NULL,
    aggregate_id    UUID NOT NULL,
    event_type      VARCHAR(255) NOT NULL,
    payload         JSONB NOT NULL,
    version         BIGINT NOT NULL CHECK (version >= 1),
    correlation_id  UUID NOT NULL,
    occurred_at     TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT domain_events_pkey PRIMARY KEY (event_id),
    CONSTRAINT domain_events_stream_version_key UNIQUE (aggregate_id, version)
);

CREATE INDEX IF NOT EXISTS idx_domain_events_correlation_id
    ON domain_events (correlation_id);
";

/// Unique `(aggregate_id, version)` constraint of `domain_events`.
pub const STREAM_VERSION_CONSTRAINT: &str = "domain_events_stream_version_key";
