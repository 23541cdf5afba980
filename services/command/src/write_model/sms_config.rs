//! SMS configuration write models.

use serde::Serialize;
use smsgate_crypto::CryptoValue;
use smsgate_events::{
    event_types, AggregateType, EventError, SmsConfigEvent, SmsConfigTwilioChangedPayload,
};
use smsgate_id::{InstanceId, SmsConfigId};
use tracing::debug;

use super::{WriteModel, WriteModelBase};
use crate::db::{EventQuery, EventRow};

/// Lifecycle of an SMS configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SmsConfigState {
    #[default]
    NonExistent,
    Inactive,
    Active,
    Removed,
}

impl SmsConfigState {
    /// True while the configuration can be changed.
    pub fn exists(&self) -> bool {
        matches!(self, SmsConfigState::Inactive | SmsConfigState::Active)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TwilioProvider {
    pub sid: String,
    pub sender_number: String,
    /// Whether a token was ever stored. The token itself stays encrypted in
    /// the log.
    pub has_token: bool,
}

/// Provider-specific settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum SmsProvider {
    Twilio(TwilioProvider),
}

/// Current state of one SMS configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SmsConfigWriteModel {
    #[serde(flatten)]
    pub base: WriteModelBase,
    pub id: SmsConfigId,
    pub state: SmsConfigState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<SmsProvider>,
}

fn sms_config_query(id: SmsConfigId, instance_id: InstanceId, types: &[&'static str]) -> EventQuery {
    EventQuery {
        aggregate_type: AggregateType::SmsConfig,
        aggregate_id: id.to_string(),
        instance_id,
        event_types: types.to_vec(),
    }
}

/// Decodes a stored event, treating foreign event types as absent.
fn decode(event: &EventRow) -> Result<Option<SmsConfigEvent>, EventError> {
    match SmsConfigEvent::decode(&event.event_type, event.event_version, &event.payload) {
        Ok(decoded) => Ok(Some(decoded)),
        Err(EventError::UnknownEventType(event_type)) => {
            debug!(
                aggregate_id = %event.aggregate_id,
                aggregate_seq = %event.aggregate_seq,
                event_type = %event_type,
                "Skipping unknown event type"
            );
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

impl SmsConfigWriteModel {
    pub fn new(id: SmsConfigId, instance_id: InstanceId) -> Self {
        Self {
            base: WriteModelBase::new(id.to_string(), instance_id),
            id,
            state: SmsConfigState::NonExistent,
            provider: None,
        }
    }

    pub fn twilio(&self) -> Option<&TwilioProvider> {
        match &self.provider {
            Some(SmsProvider::Twilio(twilio)) => Some(twilio),
            None => None,
        }
    }

    fn twilio_mut(&mut self) -> Option<&mut TwilioProvider> {
        match &mut self.provider {
            Some(SmsProvider::Twilio(twilio)) => Some(twilio),
            None => None,
        }
    }

    /// Builds the change payload for the fields that differ from the current
    /// Twilio settings. Returns `None` when nothing changed.
    pub fn new_changed_event(
        &self,
        sid: &str,
        sender_number: &str,
    ) -> Option<SmsConfigTwilioChangedPayload> {
        let current = self.twilio()?;

        let sid = (current.sid != sid).then(|| sid.to_string());
        let sender_number =
            (current.sender_number != sender_number).then(|| sender_number.to_string());

        if sid.is_none() && sender_number.is_none() {
            return None;
        }

        Some(SmsConfigTwilioChangedPayload {
            id: self.id,
            sid,
            sender_number,
        })
    }
}

impl WriteModel for SmsConfigWriteModel {
    fn query(&self) -> EventQuery {
        // Whole stream: the watermark must reach the real head even past
        // event types this model does not know.
        sms_config_query(self.id, self.base.resource_owner, &[])
    }

    fn base(&self) -> &WriteModelBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut WriteModelBase {
        &mut self.base
    }

    fn reduce(&mut self, event: &EventRow) -> Result<(), EventError> {
        let Some(decoded) = decode(event)? else {
            return Ok(());
        };

        match decoded {
            SmsConfigEvent::TwilioAdded(payload) => {
                self.state = SmsConfigState::Inactive;
                self.provider = Some(SmsProvider::Twilio(TwilioProvider {
                    sid: payload.sid,
                    sender_number: payload.sender_number,
                    has_token: payload.token.is_some(),
                }));
            }
            SmsConfigEvent::TwilioChanged(payload) => {
                if let Some(twilio) = self.twilio_mut() {
                    if let Some(sid) = payload.sid {
                        twilio.sid = sid;
                    }
                    if let Some(sender_number) = payload.sender_number {
                        twilio.sender_number = sender_number;
                    }
                }
            }
            SmsConfigEvent::TwilioTokenChanged(_) => {
                if let Some(twilio) = self.twilio_mut() {
                    twilio.has_token = true;
                }
            }
            SmsConfigEvent::TwilioActivated(_) => {
                debug_assert_eq!(
                    self.state,
                    SmsConfigState::Inactive,
                    "activated event on a configuration that is not inactive"
                );
                self.state = SmsConfigState::Active;
            }
            SmsConfigEvent::Deactivated(_) => {
                self.state = SmsConfigState::Inactive;
            }
            SmsConfigEvent::Removed(_) => {
                self.state = SmsConfigState::Removed;
                self.provider = None;
            }
        }
        Ok(())
    }
}

/// Tracks the latest encrypted Twilio token of a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwilioTokenModel {
    pub base: WriteModelBase,
    pub id: SmsConfigId,
    pub exists: bool,
    pub token: Option<CryptoValue>,
}

impl TwilioTokenModel {
    pub fn new(id: SmsConfigId, instance_id: InstanceId) -> Self {
        Self {
            base: WriteModelBase::new(id.to_string(), instance_id),
            id,
            exists: false,
            token: None,
        }
    }
}

impl WriteModel for TwilioTokenModel {
    fn query(&self) -> EventQuery {
        sms_config_query(
            self.id,
            self.base.resource_owner,
            &[
                event_types::SMS_CONFIG_TWILIO_ADDED,
                event_types::SMS_CONFIG_TWILIO_TOKEN_CHANGED,
                event_types::SMS_CONFIG_REMOVED,
            ],
        )
    }

    fn base(&self) -> &WriteModelBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut WriteModelBase {
        &mut self.base
    }

    fn reduce(&mut self, event: &EventRow) -> Result<(), EventError> {
        match decode(event)? {
            Some(SmsConfigEvent::TwilioAdded(payload)) => {
                self.exists = true;
                self.token = payload.token;
            }
            Some(SmsConfigEvent::TwilioTokenChanged(payload)) => {
                self.token = Some(payload.token);
            }
            Some(SmsConfigEvent::Removed(_)) => {
                self.exists = false;
                self.token = None;
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::write_model::append_and_reduce;
    use chrono::Utc;
    use smsgate_events::{
        ActorType, SmsConfigIdPayload, SmsConfigTwilioAddedPayload,
        SmsConfigTwilioTokenChangedPayload,
    };
    use smsgate_id::{AggregateSeq, EventId};

    fn row(model: &SmsConfigWriteModel, seq: i32, event: SmsConfigEvent) -> EventRow {
        EventRow {
            event_id: EventId::new(i64::from(seq)),
            occurred_at: Utc::now(),
            aggregate_type: AggregateType::SmsConfig,
            aggregate_id: model.id.to_string(),
            aggregate_seq: AggregateSeq::new(seq),
            event_type: event.event_type().to_string(),
            event_version: 1,
            actor_type: ActorType::User,
            actor_id: "admin".to_string(),
            instance_id: model.base.resource_owner,
            request_id: "req_test".to_string(),
            payload: event.payload().unwrap(),
        }
    }

    fn added(id: SmsConfigId, token: Option<CryptoValue>) -> SmsConfigEvent {
        SmsConfigEvent::TwilioAdded(SmsConfigTwilioAddedPayload {
            id,
            sid: "AC1".into(),
            sender_number: "+100".into(),
            token,
        })
    }

    fn token(key_id: &str) -> CryptoValue {
        CryptoValue {
            algorithm: "aes-256-gcm".into(),
            key_id: key_id.into(),
            crypted: vec![7; 16],
        }
    }

    #[test]
    fn test_added_then_changed_overwrites_only_present_fields() {
        let mut model = SmsConfigWriteModel::new(SmsConfigId::new(), InstanceId::new());
        let id = model.id;
        let events = vec![
            row(&model, 1, added(id, None)),
            row(
                &model,
                2,
                SmsConfigEvent::TwilioChanged(SmsConfigTwilioChangedPayload {
                    id,
                    sid: None,
                    sender_number: Some("+200".into()),
                }),
            ),
        ];

        append_and_reduce(&mut model, &events).unwrap();

        assert_eq!(model.state, SmsConfigState::Inactive);
        let twilio = model.twilio().unwrap();
        assert_eq!(twilio.sid, "AC1");
        assert_eq!(twilio.sender_number, "+200");
        assert!(!twilio.has_token);
    }

    #[test]
    fn test_lifecycle_fold() {
        let mut model = SmsConfigWriteModel::new(SmsConfigId::new(), InstanceId::new());
        let id = model.id;
        let id_payload = SmsConfigIdPayload { id };

        let events = vec![
            row(&model, 1, added(id, Some(token("k1")))),
            row(&model, 2, SmsConfigEvent::TwilioActivated(id_payload.clone())),
        ];
        append_and_reduce(&mut model, &events).unwrap();
        assert_eq!(model.state, SmsConfigState::Active);
        assert!(model.twilio().unwrap().has_token);

        let events = vec![
            row(&model, 3, SmsConfigEvent::Deactivated(id_payload.clone())),
            row(&model, 4, SmsConfigEvent::Removed(id_payload)),
        ];
        append_and_reduce(&mut model, &events).unwrap();
        assert_eq!(model.state, SmsConfigState::Removed);
        assert!(!model.state.exists());
        assert!(model.provider.is_none());
        assert_eq!(model.processed_sequence(), AggregateSeq::new(4));
    }

    #[test]
    fn test_unknown_event_type_is_skipped_but_advances_watermark() {
        let mut model = SmsConfigWriteModel::new(SmsConfigId::new(), InstanceId::new());
        let mut foreign = row(&model, 1, added(model.id, None));
        foreign.event_type = "sms_config.vonage.added".into();

        append_and_reduce(&mut model, &[foreign]).unwrap();
        assert_eq!(model.state, SmsConfigState::NonExistent);
        assert_eq!(model.processed_sequence(), AggregateSeq::new(1));
    }

    #[test]
    fn test_write_model_loads_whole_stream() {
        let model = SmsConfigWriteModel::new(SmsConfigId::new(), InstanceId::new());
        let query = model.query();
        assert_eq!(query.aggregate_id, model.id.to_string());
        assert!(query.event_types.is_empty());

        let tokens = TwilioTokenModel::new(model.id, model.base.resource_owner);
        assert!(!tokens.query().event_types.is_empty());
    }

    #[test]
    fn test_corrupt_payload_is_an_error() {
        let mut model = SmsConfigWriteModel::new(SmsConfigId::new(), InstanceId::new());
        let mut broken = row(&model, 1, added(model.id, None));
        broken.payload = serde_json::json!({"sid": 5});

        assert!(append_and_reduce(&mut model, &[broken]).is_err());
        assert_eq!(model.processed_sequence(), AggregateSeq::ZERO);
    }

    #[test]
    fn test_new_changed_event_reports_only_differences() {
        let mut model = SmsConfigWriteModel::new(SmsConfigId::new(), InstanceId::new());
        let event = row(&model, 1, added(model.id, None));
        append_and_reduce(&mut model, &[event]).unwrap();

        assert!(model.new_changed_event("AC1", "+100").is_none());

        let change = model.new_changed_event("AC2", "+100").unwrap();
        assert_eq!(change.sid.as_deref(), Some("AC2"));
        assert!(change.sender_number.is_none());
    }

    #[test]
    fn test_new_changed_event_requires_provider() {
        let model = SmsConfigWriteModel::new(SmsConfigId::new(), InstanceId::new());
        assert!(model.new_changed_event("AC2", "+200").is_none());
    }

    #[test]
    fn test_token_model_keeps_latest_token() {
        let config = SmsConfigWriteModel::new(SmsConfigId::new(), InstanceId::new());
        let id = config.id;
        let mut model = TwilioTokenModel::new(id, config.base.resource_owner);

        let events = vec![
            row(&config, 1, added(id, Some(token("k1")))),
            row(
                &config,
                2,
                SmsConfigEvent::TwilioTokenChanged(SmsConfigTwilioTokenChangedPayload {
                    id,
                    token: token("k2"),
                }),
            ),
        ];
        append_and_reduce(&mut model, &events).unwrap();

        assert!(model.exists);
        assert_eq!(model.token.as_ref().map(|t| t.key_id.as_str()), Some("k2"));
    }

    #[test]
    fn test_serialized_view_has_no_token_material() {
        let mut model = SmsConfigWriteModel::new(SmsConfigId::new(), InstanceId::new());
        let event = row(&model, 1, added(model.id, Some(token("k1"))));
        append_and_reduce(&mut model, &[event]).unwrap();

        let json = serde_json::to_value(&model).unwrap();
        assert_eq!(json["state"], "inactive");
        assert_eq!(json["provider"]["provider"], "twilio");
        assert_eq!(json["provider"]["has_token"], true);
        assert!(json["provider"].get("token").is_none());
    }
}
