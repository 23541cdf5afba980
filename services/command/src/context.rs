//! Per-request command context and the metadata returned to callers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use smsgate_events::ActorType;
use smsgate_id::{AggregateSeq, InstanceId, RequestId};

/// Who is issuing a command, for which tenant.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub instance_id: InstanceId,
    pub actor_type: ActorType,
    pub actor_id: String,
    pub request_id: RequestId,
}

impl CommandContext {
    pub fn new(instance_id: InstanceId, actor_type: ActorType, actor_id: impl Into<String>) -> Self {
        Self {
            instance_id,
            actor_type,
            actor_id: actor_id.into(),
            request_id: RequestId::new(),
        }
    }

    /// Context for commands issued by the system itself.
    pub fn system(instance_id: InstanceId) -> Self {
        Self::new(instance_id, ActorType::System, "system")
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }
}

/// Resource metadata after a successful command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectDetails {
    pub resource_id: String,
    pub resource_owner: InstanceId,
    pub sequence: AggregateSeq,
    pub change_date: Option<DateTime<Utc>>,
}
