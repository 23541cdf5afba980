//! Event log boundary.
//!
//! This module provides:
//! - The [`EventStore`] trait: conditional append and filtered replay
//! - [`PgEventStore`]: Postgres implementation on SQLx
//! - [`InMemoryEventStore`]: process-local implementation for tests and
//!   embedding
//! - Connection pool management and migrations

mod error;
mod event_store;
mod memory;

pub use error::DbError;
pub use event_store::PgEventStore;
pub use memory::InMemoryEventStore;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use smsgate_events::{ActorType, AggregateType};
use smsgate_id::{AggregateSeq, EventId, InstanceId, RequestId};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

/// Input for appending a new event.
#[derive(Debug, Clone)]
pub struct AppendEvent {
    pub aggregate_type: AggregateType,
    pub aggregate_id: String,
    pub aggregate_seq: AggregateSeq,
    pub event_type: String,
    pub event_version: i32,
    pub actor_type: ActorType,
    pub actor_id: String,
    pub instance_id: InstanceId,
    pub request_id: RequestId,
    pub payload: serde_json::Value,
}

/// A persisted event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRow {
    pub event_id: EventId,
    pub occurred_at: DateTime<Utc>,
    pub aggregate_type: AggregateType,
    pub aggregate_id: String,
    pub aggregate_seq: AggregateSeq,
    pub event_type: String,
    pub event_version: i32,
    pub actor_type: ActorType,
    pub actor_id: String,
    pub instance_id: InstanceId,
    pub request_id: String,
    pub payload: serde_json::Value,
}

/// Selects the events of one aggregate stream, in ascending sequence order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    pub aggregate_type: AggregateType,
    pub aggregate_id: String,
    pub instance_id: InstanceId,
    /// Restricts the event types; empty means all.
    pub event_types: Vec<&'static str>,
}

impl EventQuery {
    pub fn matches(&self, event: &EventRow) -> bool {
        event.aggregate_type == self.aggregate_type
            && event.aggregate_id == self.aggregate_id
            && event.instance_id == self.instance_id
            && (self.event_types.is_empty()
                || self.event_types.contains(&event.event_type.as_str()))
    }
}

/// Append-only, per-aggregate ordered event log.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends a batch of events to a single aggregate.
    ///
    /// The batch must be contiguous and start right after the current head
    /// of the stream; otherwise nothing is written and
    /// [`DbError::SequenceConflict`] is returned. Returns the persisted rows.
    async fn push(&self, events: Vec<AppendEvent>) -> Result<Vec<EventRow>, DbError>;

    /// Returns the events matching `query` in ascending `aggregate_seq` order.
    async fn filter(&self, query: &EventQuery) -> Result<Vec<EventRow>, DbError>;
}

/// Checks that a batch targets one aggregate with contiguous sequences.
///
/// Returns the head the batch expects to append after.
pub(crate) fn validate_batch(events: &[AppendEvent]) -> Result<Option<AggregateSeq>, DbError> {
    let Some(first) = events.first() else {
        return Ok(None);
    };

    for (offset, event) in events.iter().enumerate() {
        if event.aggregate_type != first.aggregate_type || event.aggregate_id != first.aggregate_id
        {
            return Err(DbError::InvalidBatch(
                "events for more than one aggregate".to_string(),
            ));
        }
        let want = first.aggregate_seq.value() + offset as i32;
        if event.aggregate_seq.value() != want {
            return Err(DbError::InvalidBatch(format!(
                "non-contiguous aggregate_seq {} (expected {want})",
                event.aggregate_seq
            )));
        }
    }

    if first.aggregate_seq < AggregateSeq::FIRST {
        return Err(DbError::InvalidBatch(format!(
            "aggregate_seq must start at {}",
            AggregateSeq::FIRST
        )));
    }

    Ok(Some(AggregateSeq::new(first.aggregate_seq.value() - 1)))
}

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database connection URL.
    pub database_url: String,

    /// Maximum number of connections in the pool.
    pub max_connections: u32,

    /// Minimum number of idle connections.
    pub min_connections: u32,

    /// Connection acquire timeout.
    pub acquire_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/smsgate".to_string(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

impl DbConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let database_url = std::env::var("SMSGATE_DATABASE_URL")
            .or_else(|_| std::env::var("DATABASE_URL"))
            .unwrap_or(defaults.database_url);

        let max_connections = std::env::var("SMSGATE_DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_connections);

        let acquire_timeout = std::env::var("SMSGATE_DB_ACQUIRE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.acquire_timeout);

        Self {
            database_url,
            max_connections,
            acquire_timeout,
            ..defaults
        }
    }
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Connecting to database"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.database_url)
            .await
            .map_err(DbError::Connect)?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run pending migrations from the first `migrations/` directory found.
    pub async fn run_migrations(&self) -> Result<(), DbError> {
        let candidates = vec![
            std::path::PathBuf::from("./migrations"),
            std::path::PathBuf::from("services/command/migrations"),
            std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations"),
        ];
        let mut last_error: Option<sqlx::migrate::MigrateError> = None;

        for dir in &candidates {
            match sqlx::migrate::Migrator::new(dir.clone()).await {
                Ok(migrator) => {
                    info!(migrations_dir = %dir.display(), "Running database migrations");
                    migrator.run(&self.pool).await.map_err(DbError::Migration)?;
                    info!("Database migrations complete");
                    return Ok(());
                }
                Err(e) => {
                    last_error = Some(e);
                }
            }
        }

        let tried = candidates
            .iter()
            .map(|dir| dir.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");

        Err(DbError::MigrationDirNotFound {
            tried,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string()),
        })
    }

    /// Get an event store handle.
    pub fn event_store(&self) -> PgEventStore {
        PgEventStore::new(self.pool.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn append(aggregate_id: &str, seq: i32) -> AppendEvent {
        AppendEvent {
            aggregate_type: AggregateType::SmsConfig,
            aggregate_id: aggregate_id.to_string(),
            aggregate_seq: AggregateSeq::new(seq),
            event_type: "sms_config.removed".to_string(),
            event_version: 1,
            actor_type: ActorType::System,
            actor_id: "test".to_string(),
            instance_id: InstanceId::new(),
            request_id: RequestId::new(),
            payload: serde_json::json!({}),
        }
    }

    #[test]
    fn test_validate_batch_returns_expected_head() {
        let head = validate_batch(&[append("a", 3), append("a", 4)]).unwrap();
        assert_eq!(head, Some(AggregateSeq::new(2)));
        assert_eq!(validate_batch(&[]).unwrap(), None);
    }

    #[test]
    fn test_validate_batch_rejects_gaps() {
        let err = validate_batch(&[append("a", 1), append("a", 3)]).unwrap_err();
        assert!(matches!(err, DbError::InvalidBatch(_)));
    }

    #[test]
    fn test_validate_batch_rejects_mixed_aggregates() {
        let err = validate_batch(&[append("a", 1), append("b", 2)]).unwrap_err();
        assert!(matches!(err, DbError::InvalidBatch(_)));
    }

    #[test]
    fn test_validate_batch_rejects_zero_sequence() {
        let err = validate_batch(&[append("a", 0)]).unwrap_err();
        assert!(matches!(err, DbError::InvalidBatch(_)));
    }

    #[test]
    fn test_db_config_defaults() {
        let config = DbConfig::default();
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 1);
    }
}
