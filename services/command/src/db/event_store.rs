//! Postgres event store.
//!
//! - Append a batch with optimistic concurrency control
//! - Query one aggregate stream in sequence order (for loading write models)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use smsgate_id::{AggregateSeq, EventId};
use sqlx::{postgres::PgPool, postgres::PgRow, Row};
use tracing::{debug, warn};

use super::{validate_batch, AppendEvent, DbError, EventQuery, EventRow, EventStore};

const UNIQUE_VIOLATION: &str = "23505";

/// Event store backed by the `events` table.
#[derive(Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn corrupt(event_id: i64, message: impl std::fmt::Display) -> DbError {
    DbError::CorruptRow {
        event_id,
        message: message.to_string(),
    }
}

fn decode_row(row: &PgRow) -> Result<EventRow, DbError> {
    let event_id: i64 = row.try_get("event_id").map_err(DbError::Query)?;
    let aggregate_type: String = row.try_get("aggregate_type").map_err(DbError::Query)?;
    let actor_type: String = row.try_get("actor_type").map_err(DbError::Query)?;
    let instance_id: String = row.try_get("instance_id").map_err(DbError::Query)?;
    let aggregate_seq: i32 = row.try_get("aggregate_seq").map_err(DbError::Query)?;

    Ok(EventRow {
        event_id: EventId::new(event_id),
        occurred_at: row.try_get("occurred_at").map_err(DbError::Query)?,
        aggregate_type: aggregate_type
            .parse()
            .map_err(|e| corrupt(event_id, e))?,
        aggregate_id: row.try_get("aggregate_id").map_err(DbError::Query)?,
        aggregate_seq: AggregateSeq::new(aggregate_seq),
        event_type: row.try_get("event_type").map_err(DbError::Query)?,
        event_version: row.try_get("event_version").map_err(DbError::Query)?,
        actor_type: actor_type.parse().map_err(|e| corrupt(event_id, e))?,
        actor_id: row.try_get("actor_id").map_err(DbError::Query)?,
        instance_id: instance_id.parse().map_err(|e| corrupt(event_id, e))?,
        request_id: row.try_get("request_id").map_err(DbError::Query)?,
        payload: row.try_get("payload").map_err(DbError::Query)?,
    })
}

#[async_trait]
impl EventStore for PgEventStore {
    /// Appends the batch in one transaction.
    ///
    /// The head is checked inside the transaction and the unique index on
    /// `(aggregate_type, aggregate_id, aggregate_seq)` catches writers that
    /// race past the check. Dropping the future before commit rolls back.
    async fn push(&self, events: Vec<AppendEvent>) -> Result<Vec<EventRow>, DbError> {
        let Some(expected) = validate_batch(&events)? else {
            return Ok(Vec::new());
        };
        let aggregate_type = events[0].aggregate_type;
        let aggregate_id = events[0].aggregate_id.clone();

        let mut tx = self.pool.begin().await.map_err(DbError::Query)?;

        let head: i32 = sqlx::query(
            r#"
            SELECT COALESCE(MAX(aggregate_seq), 0) AS head
            FROM events
            WHERE aggregate_type = $1 AND aggregate_id = $2
            "#,
        )
        .bind(aggregate_type.as_str())
        .bind(&aggregate_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(DbError::Query)?
        .try_get("head")
        .map_err(DbError::Query)?;

        if head != expected.value() {
            return Err(DbError::SequenceConflict {
                aggregate_id,
                expected: expected.value(),
                actual: head,
            });
        }

        let mut pushed = Vec::with_capacity(events.len());
        for event in events {
            let request_id = event.request_id.to_string();
            let row = sqlx::query(
                r#"
                INSERT INTO events (
                    aggregate_type,
                    aggregate_id,
                    aggregate_seq,
                    event_type,
                    event_version,
                    actor_type,
                    actor_id,
                    instance_id,
                    request_id,
                    payload
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                RETURNING event_id, occurred_at
                "#,
            )
            .bind(event.aggregate_type.as_str())
            .bind(&event.aggregate_id)
            .bind(event.aggregate_seq.value())
            .bind(&event.event_type)
            .bind(event.event_version)
            .bind(event.actor_type.as_str())
            .bind(&event.actor_id)
            .bind(event.instance_id.to_string())
            .bind(&request_id)
            .bind(&event.payload)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e {
                    if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
                        warn!(
                            aggregate_id = %event.aggregate_id,
                            aggregate_seq = %event.aggregate_seq,
                            "Concurrent append detected"
                        );
                        return DbError::SequenceConflict {
                            aggregate_id: event.aggregate_id.clone(),
                            expected: expected.value(),
                            actual: event.aggregate_seq.value(),
                        };
                    }
                }
                DbError::Query(e)
            })?;

            let event_id: i64 = row.try_get("event_id").map_err(DbError::Query)?;
            let occurred_at: DateTime<Utc> = row.try_get("occurred_at").map_err(DbError::Query)?;

            pushed.push(EventRow {
                event_id: EventId::new(event_id),
                occurred_at,
                aggregate_type: event.aggregate_type,
                aggregate_id: event.aggregate_id,
                aggregate_seq: event.aggregate_seq,
                event_type: event.event_type,
                event_version: event.event_version,
                actor_type: event.actor_type,
                actor_id: event.actor_id,
                instance_id: event.instance_id,
                request_id,
                payload: event.payload,
            });
        }

        tx.commit().await.map_err(DbError::Query)?;
        debug!(aggregate_id = %aggregate_id, count = pushed.len(), "Appended events");
        Ok(pushed)
    }

    async fn filter(&self, query: &EventQuery) -> Result<Vec<EventRow>, DbError> {
        let event_types: Vec<String> = query.event_types.iter().map(|t| t.to_string()).collect();

        let rows = sqlx::query(
            r#"
            SELECT
                event_id,
                occurred_at,
                aggregate_type,
                aggregate_id,
                aggregate_seq,
                event_type,
                event_version,
                actor_type,
                actor_id,
                instance_id,
                request_id,
                payload
            FROM events
            WHERE aggregate_type = $1
              AND aggregate_id = $2
              AND instance_id = $3
              AND (cardinality($4::text[]) = 0 OR event_type = ANY($4))
            ORDER BY aggregate_seq ASC
            "#,
        )
        .bind(query.aggregate_type.as_str())
        .bind(&query.aggregate_id)
        .bind(query.instance_id.to_string())
        .bind(&event_types)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::Query)?;

        rows.iter().map(decode_row).collect()
    }
}
