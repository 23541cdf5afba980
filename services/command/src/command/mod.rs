//! Command handlers.
//!
//! Every command follows the same protocol:
//!
//! 1. Validate arguments before any I/O
//! 2. Load the write model by replaying its stream
//! 3. Check preconditions against the freshly reduced state
//! 4. Encrypt secrets, if the command carries any
//! 5. Push the resulting events right after the model's watermark
//! 6. Fold the persisted events back into the same model
//!
//! A concurrent writer makes step 5 fail with
//! [`CommandError::ConcurrencyConflict`]; the model is then left untouched and
//! the command is not retried.

mod sms_config;

pub use sms_config::{TwilioConfig, TwilioConfigChange};

use std::sync::Arc;

use smsgate_crypto::EncryptionAlgorithm;
use smsgate_events::{SmsConfigEvent, SMS_CONFIG_EVENT_VERSION};
use tracing::{debug, warn};

use crate::context::CommandContext;
use crate::db::{AppendEvent, EventStore};
use crate::error::CommandError;
use crate::id_generator::IdGenerator;
use crate::write_model::{append_and_reduce, filter_to_reducer, WriteModel};

/// Entry point for all configuration commands.
///
/// Cheap to clone; holds no per-aggregate state between calls.
#[derive(Clone)]
pub struct Commands {
    inner: Arc<CommandsInner>,
}

struct CommandsInner {
    event_store: Arc<dyn EventStore>,
    id_generator: Arc<dyn IdGenerator>,
    sms_encryption: Arc<dyn EncryptionAlgorithm>,
}

impl Commands {
    pub fn new(
        event_store: Arc<dyn EventStore>,
        id_generator: Arc<dyn IdGenerator>,
        sms_encryption: Arc<dyn EncryptionAlgorithm>,
    ) -> Self {
        Self {
            inner: Arc::new(CommandsInner {
                event_store,
                id_generator,
                sms_encryption,
            }),
        }
    }

    fn sms_encryption(&self) -> &dyn EncryptionAlgorithm {
        self.inner.sms_encryption.as_ref()
    }

    async fn load<M>(&self, model: &mut M) -> Result<(), CommandError>
    where
        M: WriteModel + Send,
    {
        filter_to_reducer(self.inner.event_store.as_ref(), model).await
    }

    /// Appends `events` after the model's watermark and folds the persisted
    /// rows into the model.
    async fn push<M>(
        &self,
        ctx: &CommandContext,
        model: &mut M,
        events: Vec<SmsConfigEvent>,
    ) -> Result<(), CommandError>
    where
        M: WriteModel + Send,
    {
        let aggregate_type = model.query().aggregate_type;
        let aggregate_id = model.base().aggregate_id.clone();
        let mut seq = model.processed_sequence();

        let mut batch = Vec::with_capacity(events.len());
        for event in events {
            seq = seq.next();
            batch.push(AppendEvent {
                aggregate_type,
                aggregate_id: aggregate_id.clone(),
                aggregate_seq: seq,
                event_type: event.event_type().to_string(),
                event_version: SMS_CONFIG_EVENT_VERSION,
                actor_type: ctx.actor_type,
                actor_id: ctx.actor_id.clone(),
                instance_id: ctx.instance_id,
                request_id: ctx.request_id,
                payload: event.payload()?,
            });
        }

        let pushed = match self.inner.event_store.push(batch).await {
            Ok(pushed) => pushed,
            Err(e) if e.is_conflict() => {
                warn!(
                    aggregate_id = %aggregate_id,
                    processed_sequence = %model.processed_sequence(),
                    request_id = %ctx.request_id,
                    "Aggregate changed since it was loaded"
                );
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };

        debug!(
            aggregate_id = %aggregate_id,
            count = pushed.len(),
            "Folding pushed events"
        );
        append_and_reduce(model, &pushed)
    }
}
