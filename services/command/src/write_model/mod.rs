//! Write models: in-memory projections of one aggregate, rebuilt from its
//! event stream before every command.
//!
//! Loading and post-push catch-up share one folding path,
//! [`append_and_reduce`], so a model advanced by a push is indistinguishable
//! from one freshly replayed from the log.

mod sms_config;

pub use sms_config::{
    SmsConfigState, SmsConfigWriteModel, SmsProvider, TwilioProvider, TwilioTokenModel,
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use smsgate_events::EventError;
use smsgate_id::{AggregateSeq, InstanceId};
use tracing::debug;

use crate::context::ObjectDetails;
use crate::db::{EventQuery, EventRow, EventStore};
use crate::error::CommandError;

/// Bookkeeping shared by every write model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteModelBase {
    pub aggregate_id: String,
    pub resource_owner: InstanceId,
    /// Highest `aggregate_seq` folded into the model.
    pub processed_sequence: AggregateSeq,
    pub change_date: Option<DateTime<Utc>>,
}

impl WriteModelBase {
    pub fn new(aggregate_id: impl Into<String>, resource_owner: InstanceId) -> Self {
        Self {
            aggregate_id: aggregate_id.into(),
            resource_owner,
            processed_sequence: AggregateSeq::ZERO,
            change_date: None,
        }
    }

    pub fn object_details(&self) -> ObjectDetails {
        ObjectDetails {
            resource_id: self.aggregate_id.clone(),
            resource_owner: self.resource_owner,
            sequence: self.processed_sequence,
            change_date: self.change_date,
        }
    }
}

/// A projection that can be rebuilt by folding an aggregate's events.
pub trait WriteModel {
    /// The stream (and event types) this model folds.
    fn query(&self) -> EventQuery;

    fn base(&self) -> &WriteModelBase;

    fn base_mut(&mut self) -> &mut WriteModelBase;

    /// Applies one event. Sequence bookkeeping is done by the caller.
    fn reduce(&mut self, event: &EventRow) -> Result<(), EventError>;

    fn processed_sequence(&self) -> AggregateSeq {
        self.base().processed_sequence
    }
}

/// Folds `events` into `model` in order.
///
/// Events at or below the model's watermark were already applied and are
/// skipped, so folding the same rows twice is a no-op.
pub fn append_and_reduce<M>(model: &mut M, events: &[EventRow]) -> Result<(), CommandError>
where
    M: WriteModel + ?Sized,
{
    for event in events {
        let watermark = model.processed_sequence();
        if event.aggregate_seq <= watermark {
            debug!(
                aggregate_id = %event.aggregate_id,
                aggregate_seq = %event.aggregate_seq,
                processed_sequence = %watermark,
                "Skipping already applied event"
            );
            continue;
        }

        model.reduce(event)?;

        let base = model.base_mut();
        base.processed_sequence = event.aggregate_seq;
        base.change_date = Some(event.occurred_at);
    }
    Ok(())
}

/// Replays the model's stream from the event store into the model.
pub async fn filter_to_reducer<M>(store: &dyn EventStore, model: &mut M) -> Result<(), CommandError>
where
    M: WriteModel + Send + ?Sized,
{
    let events = store.filter(&model.query()).await?;
    append_and_reduce(model, &events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use smsgate_events::{event_types, ActorType, AggregateType};

    /// Counts folded events.
    struct Counter {
        base: WriteModelBase,
        applied: Vec<i32>,
    }

    impl WriteModel for Counter {
        fn query(&self) -> EventQuery {
            EventQuery {
                aggregate_type: AggregateType::SmsConfig,
                aggregate_id: self.base.aggregate_id.clone(),
                instance_id: self.base.resource_owner,
                event_types: Vec::new(),
            }
        }

        fn base(&self) -> &WriteModelBase {
            &self.base
        }

        fn base_mut(&mut self) -> &mut WriteModelBase {
            &mut self.base
        }

        fn reduce(&mut self, event: &EventRow) -> Result<(), EventError> {
            self.applied.push(event.aggregate_seq.value());
            Ok(())
        }
    }

    fn row(instance_id: InstanceId, seq: i32) -> EventRow {
        EventRow {
            event_id: smsgate_id::EventId::new(i64::from(seq)),
            occurred_at: Utc::now(),
            aggregate_type: AggregateType::SmsConfig,
            aggregate_id: "agg".to_string(),
            aggregate_seq: AggregateSeq::new(seq),
            event_type: event_types::SMS_CONFIG_DEACTIVATED.to_string(),
            event_version: 1,
            actor_type: ActorType::System,
            actor_id: "test".to_string(),
            instance_id,
            request_id: "req".to_string(),
            payload: serde_json::json!({}),
        }
    }

    #[test]
    fn test_append_and_reduce_advances_watermark() {
        let instance = InstanceId::new();
        let mut model = Counter {
            base: WriteModelBase::new("agg", instance),
            applied: Vec::new(),
        };

        let events = vec![row(instance, 1), row(instance, 2)];
        append_and_reduce(&mut model, &events).unwrap();

        assert_eq!(model.processed_sequence(), AggregateSeq::new(2));
        assert_eq!(model.base.change_date, Some(events[1].occurred_at));
        assert_eq!(model.applied, vec![1, 2]);
    }

    #[test]
    fn test_append_and_reduce_skips_applied_events() {
        let instance = InstanceId::new();
        let mut model = Counter {
            base: WriteModelBase::new("agg", instance),
            applied: Vec::new(),
        };

        append_and_reduce(&mut model, &[row(instance, 1), row(instance, 2)]).unwrap();
        append_and_reduce(&mut model, &[row(instance, 2), row(instance, 3)]).unwrap();

        assert_eq!(model.applied, vec![1, 2, 3]);
        assert_eq!(model.base.object_details().sequence, AggregateSeq::new(3));
    }
}
