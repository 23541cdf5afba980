//! Event store error types.

use thiserror::Error;

/// Event store operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Failed to connect to the database.
    #[error("failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    /// Failed to execute a query.
    #[error("query failed: {0}")]
    Query(#[source] sqlx::Error),

    /// Failed to run migrations.
    #[error("migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),

    /// Migration directory not found in the current environment.
    #[error("migration directory not found; tried {tried}. Last error: {last_error}")]
    MigrationDirNotFound { tried: String, last_error: String },

    /// Aggregate sequence conflict (optimistic concurrency).
    ///
    /// `expected` is the head the writer appended after, `actual` the head
    /// found in the log.
    #[error("aggregate sequence conflict on {aggregate_id}: expected head {expected}, got {actual}")]
    SequenceConflict {
        aggregate_id: String,
        expected: i32,
        actual: i32,
    },

    /// A push batch that spans aggregates or is not contiguous.
    #[error("invalid append batch: {0}")]
    InvalidBatch(String),

    /// A stored row could not be decoded.
    #[error("corrupt event row {event_id}: {message}")]
    CorruptRow { event_id: i64, message: String },
}

impl DbError {
    /// Returns true for optimistic concurrency violations.
    pub fn is_conflict(&self) -> bool {
        matches!(self, DbError::SequenceConflict { .. })
    }
}
