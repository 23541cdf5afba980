//! In-memory event store.

use async_trait::async_trait;
use chrono::Utc;
use smsgate_id::{AggregateSeq, EventId};
use tokio::sync::RwLock;
use tracing::debug;

use super::{validate_batch, AppendEvent, DbError, EventQuery, EventRow, EventStore};

/// Process-local event log with the same append contract as Postgres.
///
/// A push validates and appends under one write lock, so a batch is either
/// fully visible or not at all.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    events: RwLock<Vec<EventRow>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored event in append order.
    pub async fn all_events(&self) -> Vec<EventRow> {
        self.events.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn push(&self, events: Vec<AppendEvent>) -> Result<Vec<EventRow>, DbError> {
        let Some(expected) = validate_batch(&events)? else {
            return Ok(Vec::new());
        };
        let first = &events[0];

        let mut log = self.events.write().await;

        let head = log
            .iter()
            .filter(|e| {
                e.aggregate_type == first.aggregate_type && e.aggregate_id == first.aggregate_id
            })
            .map(|e| e.aggregate_seq)
            .max()
            .unwrap_or(AggregateSeq::ZERO);

        if head != expected {
            return Err(DbError::SequenceConflict {
                aggregate_id: first.aggregate_id.clone(),
                expected: expected.value(),
                actual: head.value(),
            });
        }

        let occurred_at = Utc::now();
        let mut next_id = log.last().map(|e| e.event_id.value()).unwrap_or(0);
        let mut pushed = Vec::with_capacity(events.len());

        for event in events {
            next_id += 1;
            pushed.push(EventRow {
                event_id: EventId::new(next_id),
                occurred_at,
                aggregate_type: event.aggregate_type,
                aggregate_id: event.aggregate_id,
                aggregate_seq: event.aggregate_seq,
                event_type: event.event_type,
                event_version: event.event_version,
                actor_type: event.actor_type,
                actor_id: event.actor_id,
                instance_id: event.instance_id,
                request_id: event.request_id.to_string(),
                payload: event.payload,
            });
        }

        log.extend(pushed.iter().cloned());
        debug!(
            aggregate_id = %first_id(&pushed),
            count = pushed.len(),
            "Appended events"
        );
        Ok(pushed)
    }

    async fn filter(&self, query: &EventQuery) -> Result<Vec<EventRow>, DbError> {
        let log = self.events.read().await;
        let mut rows: Vec<EventRow> = log.iter().filter(|e| query.matches(e)).cloned().collect();
        rows.sort_by_key(|e| e.aggregate_seq);
        Ok(rows)
    }
}

fn first_id(rows: &[EventRow]) -> &str {
    rows.first().map(|e| e.aggregate_id.as_str()).unwrap_or_default()
}
