//! Event types and payloads for the SMS configuration aggregate.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use smsgate_crypto::CryptoValue;
use smsgate_id::SmsConfigId;

use crate::EventError;

/// Current schema version of every SMS configuration event.
pub const SMS_CONFIG_EVENT_VERSION: i32 = 1;

/// All event type names as constants.
pub mod event_types {
    pub const SMS_CONFIG_TWILIO_ADDED: &str = "sms_config.twilio.added";
    pub const SMS_CONFIG_TWILIO_CHANGED: &str = "sms_config.twilio.changed";
    pub const SMS_CONFIG_TWILIO_TOKEN_CHANGED: &str = "sms_config.twilio.token_changed";
    pub const SMS_CONFIG_TWILIO_ACTIVATED: &str = "sms_config.twilio.activated";
    pub const SMS_CONFIG_DEACTIVATED: &str = "sms_config.deactivated";
    pub const SMS_CONFIG_REMOVED: &str = "sms_config.removed";

    /// Every event type that belongs to an SMS configuration stream.
    pub const SMS_CONFIG_ALL: &[&str] = &[
        SMS_CONFIG_TWILIO_ADDED,
        SMS_CONFIG_TWILIO_CHANGED,
        SMS_CONFIG_TWILIO_TOKEN_CHANGED,
        SMS_CONFIG_TWILIO_ACTIVATED,
        SMS_CONFIG_DEACTIVATED,
        SMS_CONFIG_REMOVED,
    ];
}

// =============================================================================
// Event Payloads
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsConfigTwilioAddedPayload {
    pub id: SmsConfigId,
    pub sid: String,
    pub sender_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<CryptoValue>,
}

/// Partial update: only the fields that differ from the previous state are set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsConfigTwilioChangedPayload {
    pub id: SmsConfigId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsConfigTwilioTokenChangedPayload {
    pub id: SmsConfigId,
    pub token: CryptoValue,
}

/// Payload of the activated, deactivated and removed events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsConfigIdPayload {
    pub id: SmsConfigId,
}

// =============================================================================
// Typed Events
// =============================================================================

/// A decoded SMS configuration event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmsConfigEvent {
    TwilioAdded(SmsConfigTwilioAddedPayload),
    TwilioChanged(SmsConfigTwilioChangedPayload),
    TwilioTokenChanged(SmsConfigTwilioTokenChangedPayload),
    TwilioActivated(SmsConfigIdPayload),
    Deactivated(SmsConfigIdPayload),
    Removed(SmsConfigIdPayload),
}

fn decode_payload<P: DeserializeOwned>(
    event_type: &str,
    payload: &serde_json::Value,
) -> Result<P, EventError> {
    P::deserialize(payload).map_err(|e| EventError::InvalidPayload {
        event_type: event_type.to_string(),
        message: e.to_string(),
    })
}

impl SmsConfigEvent {
    /// Decodes a stored event by its type tag and schema version.
    pub fn decode(
        event_type: &str,
        event_version: i32,
        payload: &serde_json::Value,
    ) -> Result<Self, EventError> {
        use event_types::*;

        if !SMS_CONFIG_ALL.contains(&event_type) {
            return Err(EventError::UnknownEventType(event_type.to_string()));
        }
        if event_version != SMS_CONFIG_EVENT_VERSION {
            return Err(EventError::UnsupportedVersion {
                event_type: event_type.to_string(),
                version: event_version,
            });
        }

        let event = match event_type {
            SMS_CONFIG_TWILIO_ADDED => Self::TwilioAdded(decode_payload(event_type, payload)?),
            SMS_CONFIG_TWILIO_CHANGED => Self::TwilioChanged(decode_payload(event_type, payload)?),
            SMS_CONFIG_TWILIO_TOKEN_CHANGED => {
                Self::TwilioTokenChanged(decode_payload(event_type, payload)?)
            }
            SMS_CONFIG_TWILIO_ACTIVATED => {
                Self::TwilioActivated(decode_payload(event_type, payload)?)
            }
            SMS_CONFIG_DEACTIVATED => Self::Deactivated(decode_payload(event_type, payload)?),
            _ => Self::Removed(decode_payload(event_type, payload)?),
        };
        Ok(event)
    }

    pub fn event_type(&self) -> &'static str {
        use event_types::*;

        match self {
            Self::TwilioAdded(_) => SMS_CONFIG_TWILIO_ADDED,
            Self::TwilioChanged(_) => SMS_CONFIG_TWILIO_CHANGED,
            Self::TwilioTokenChanged(_) => SMS_CONFIG_TWILIO_TOKEN_CHANGED,
            Self::TwilioActivated(_) => SMS_CONFIG_TWILIO_ACTIVATED,
            Self::Deactivated(_) => SMS_CONFIG_DEACTIVATED,
            Self::Removed(_) => SMS_CONFIG_REMOVED,
        }
    }

    /// Serializes the payload for storage.
    pub fn payload(&self) -> Result<serde_json::Value, EventError> {
        let value = match self {
            Self::TwilioAdded(p) => serde_json::to_value(p)?,
            Self::TwilioChanged(p) => serde_json::to_value(p)?,
            Self::TwilioTokenChanged(p) => serde_json::to_value(p)?,
            Self::TwilioActivated(p) | Self::Deactivated(p) | Self::Removed(p) => {
                serde_json::to_value(p)?
            }
        };
        Ok(value)
    }
}
