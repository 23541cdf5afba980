//! SMS configuration commands.

use smsgate_crypto::{decrypt_string, encrypt};
use smsgate_events::{
    SmsConfigEvent, SmsConfigIdPayload, SmsConfigTwilioAddedPayload,
    SmsConfigTwilioTokenChangedPayload,
};
use smsgate_id::SmsConfigId;
use tracing::{info, instrument};

use super::Commands;
use crate::context::{CommandContext, ObjectDetails};
use crate::error::{message_keys, CommandError};
use crate::write_model::{SmsConfigState, SmsConfigWriteModel, TwilioTokenModel, WriteModel};

/// Settings for a new Twilio configuration.
#[derive(Clone)]
pub struct TwilioConfig {
    pub sid: String,
    pub sender_number: String,
    /// Auth token; `None` or empty stores no token.
    pub token: Option<String>,
}

impl std::fmt::Debug for TwilioConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioConfig")
            .field("sid", &self.sid)
            .field("sender_number", &self.sender_number)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// New non-secret Twilio settings. Both fields are required; only the ones
/// that differ from the stored values are recorded.
#[derive(Debug, Clone)]
pub struct TwilioConfigChange {
    pub sid: String,
    pub sender_number: String,
}

fn parse_config_id(id: &str) -> Result<SmsConfigId, CommandError> {
    if id.is_empty() {
        return Err(CommandError::invalid_argument(message_keys::ID_MISSING));
    }
    SmsConfigId::parse(id).map_err(|_| CommandError::invalid_argument(message_keys::ID_INVALID))
}

fn require(value: &str, message_key: &'static str) -> Result<(), CommandError> {
    if value.trim().is_empty() {
        return Err(CommandError::invalid_argument(message_key));
    }
    Ok(())
}

/// Lifecycle commands here are Twilio-specific; any other provider is
/// reported as not found.
fn require_twilio(model: &SmsConfigWriteModel) -> Result<(), CommandError> {
    if model.twilio().is_none() {
        return Err(CommandError::not_found(message_keys::SMS_CONFIG_NOT_FOUND));
    }
    Ok(())
}

impl Commands {
    /// Loads a configuration that exists (inactive or active).
    async fn existing_sms_config(
        &self,
        ctx: &CommandContext,
        id: SmsConfigId,
    ) -> Result<SmsConfigWriteModel, CommandError> {
        let mut model = SmsConfigWriteModel::new(id, ctx.instance_id);
        self.load(&mut model).await?;
        if !model.state.exists() {
            return Err(CommandError::not_found(message_keys::SMS_CONFIG_NOT_FOUND));
        }
        Ok(model)
    }

    /// Loads an existing configuration whose provider is Twilio.
    async fn existing_twilio_config(
        &self,
        ctx: &CommandContext,
        id: SmsConfigId,
    ) -> Result<SmsConfigWriteModel, CommandError> {
        let model = self.existing_sms_config(ctx, id).await?;
        require_twilio(&model)?;
        Ok(model)
    }

    /// Creates a new, inactive Twilio configuration.
    #[instrument(
        skip(self, ctx, config),
        fields(instance_id = %ctx.instance_id, request_id = %ctx.request_id)
    )]
    pub async fn add_sms_config_twilio(
        &self,
        ctx: &CommandContext,
        config: TwilioConfig,
    ) -> Result<(SmsConfigId, ObjectDetails), CommandError> {
        require(&config.sid, message_keys::TWILIO_SID_MISSING)?;
        require(&config.sender_number, message_keys::TWILIO_SENDER_NUMBER_MISSING)?;

        let id = SmsConfigId::from_ulid(self.inner.id_generator.next_id());
        let mut model = SmsConfigWriteModel::new(id, ctx.instance_id);
        self.load(&mut model).await?;
        if model.processed_sequence() > smsgate_id::AggregateSeq::ZERO {
            return Err(CommandError::AlreadyExists {
                message_key: message_keys::SMS_CONFIG_ALREADY_EXISTS,
            });
        }

        let token = match config.token.as_deref().filter(|t| !t.is_empty()) {
            Some(token) => Some(encrypt(token.as_bytes(), self.sms_encryption())?),
            None => None,
        };
        let has_token = token.is_some();

        let event = SmsConfigEvent::TwilioAdded(SmsConfigTwilioAddedPayload {
            id,
            sid: config.sid,
            sender_number: config.sender_number,
            token,
        });
        self.push(ctx, &mut model, vec![event]).await?;

        info!(sms_config_id = %id, has_token, "SMS config added");
        Ok((id, model.base.object_details()))
    }

    /// Updates the Twilio sid and sender number.
    #[instrument(
        skip(self, ctx, change),
        fields(instance_id = %ctx.instance_id, request_id = %ctx.request_id)
    )]
    pub async fn change_sms_config_twilio(
        &self,
        ctx: &CommandContext,
        id: &str,
        change: TwilioConfigChange,
    ) -> Result<ObjectDetails, CommandError> {
        let id = parse_config_id(id)?;
        require(&change.sid, message_keys::TWILIO_SID_MISSING)?;
        require(&change.sender_number, message_keys::TWILIO_SENDER_NUMBER_MISSING)?;

        let mut model = self.existing_twilio_config(ctx, id).await?;
        let Some(payload) = model.new_changed_event(&change.sid, &change.sender_number) else {
            return Err(CommandError::precondition_failed(
                message_keys::NO_CHANGES_FOUND,
            ));
        };
        let changed_sid = payload.sid.is_some();
        let changed_sender_number = payload.sender_number.is_some();

        self.push(ctx, &mut model, vec![SmsConfigEvent::TwilioChanged(payload)])
            .await?;

        info!(
            sms_config_id = %id,
            changed_sid,
            changed_sender_number,
            "SMS config changed"
        );
        Ok(model.base.object_details())
    }

    /// Replaces the Twilio auth token. A new token is always recorded, even if
    /// it equals the current one.
    #[instrument(
        skip(self, ctx, token),
        fields(instance_id = %ctx.instance_id, request_id = %ctx.request_id)
    )]
    pub async fn change_sms_config_twilio_token(
        &self,
        ctx: &CommandContext,
        id: &str,
        token: &str,
    ) -> Result<ObjectDetails, CommandError> {
        let id = parse_config_id(id)?;
        if token.is_empty() {
            return Err(CommandError::invalid_argument(
                message_keys::TWILIO_TOKEN_MISSING,
            ));
        }

        let mut model = self.existing_twilio_config(ctx, id).await?;
        let token = encrypt(token.as_bytes(), self.sms_encryption())?;
        let key_id = token.key_id.clone();

        let event = SmsConfigEvent::TwilioTokenChanged(SmsConfigTwilioTokenChangedPayload {
            id,
            token,
        });
        self.push(ctx, &mut model, vec![event]).await?;

        info!(sms_config_id = %id, key_id = %key_id, "SMS config token changed");
        Ok(model.base.object_details())
    }

    #[instrument(skip(self, ctx), fields(instance_id = %ctx.instance_id, request_id = %ctx.request_id))]
    pub async fn activate_sms_config_twilio(
        &self,
        ctx: &CommandContext,
        id: &str,
    ) -> Result<ObjectDetails, CommandError> {
        let id = parse_config_id(id)?;
        let mut model = self.existing_twilio_config(ctx, id).await?;
        if model.state == SmsConfigState::Active {
            return Err(CommandError::already_in_state(
                message_keys::SMS_CONFIG_ALREADY_ACTIVE,
            ));
        }

        let event = SmsConfigEvent::TwilioActivated(SmsConfigIdPayload { id });
        self.push(ctx, &mut model, vec![event]).await?;

        info!(sms_config_id = %id, "SMS config activated");
        Ok(model.base.object_details())
    }

    #[instrument(skip(self, ctx), fields(instance_id = %ctx.instance_id, request_id = %ctx.request_id))]
    pub async fn deactivate_sms_config(
        &self,
        ctx: &CommandContext,
        id: &str,
    ) -> Result<ObjectDetails, CommandError> {
        let id = parse_config_id(id)?;
        let mut model = self.existing_twilio_config(ctx, id).await?;
        if model.state == SmsConfigState::Inactive {
            return Err(CommandError::already_in_state(
                message_keys::SMS_CONFIG_ALREADY_DEACTIVATED,
            ));
        }

        let event = SmsConfigEvent::Deactivated(SmsConfigIdPayload { id });
        self.push(ctx, &mut model, vec![event]).await?;

        info!(sms_config_id = %id, "SMS config deactivated");
        Ok(model.base.object_details())
    }

    #[instrument(skip(self, ctx), fields(instance_id = %ctx.instance_id, request_id = %ctx.request_id))]
    pub async fn remove_sms_config(
        &self,
        ctx: &CommandContext,
        id: &str,
    ) -> Result<ObjectDetails, CommandError> {
        let id = parse_config_id(id)?;
        let mut model = self.existing_twilio_config(ctx, id).await?;

        let event = SmsConfigEvent::Removed(SmsConfigIdPayload { id });
        self.push(ctx, &mut model, vec![event]).await?;

        info!(sms_config_id = %id, "SMS config removed");
        Ok(model.base.object_details())
    }

    /// Current state of a configuration, without secrets.
    pub async fn sms_config(
        &self,
        ctx: &CommandContext,
        id: &str,
    ) -> Result<SmsConfigWriteModel, CommandError> {
        let id = parse_config_id(id)?;
        self.existing_sms_config(ctx, id).await
    }

    /// Decrypts the current Twilio token of a configuration.
    #[instrument(skip(self, ctx), fields(instance_id = %ctx.instance_id, request_id = %ctx.request_id))]
    pub async fn sms_config_twilio_token(
        &self,
        ctx: &CommandContext,
        id: &str,
    ) -> Result<String, CommandError> {
        let id = parse_config_id(id)?;
        let mut model = TwilioTokenModel::new(id, ctx.instance_id);
        self.load(&mut model).await?;

        if !model.exists {
            return Err(CommandError::not_found(message_keys::SMS_CONFIG_NOT_FOUND));
        }
        let Some(token) = model.token.as_ref() else {
            return Err(CommandError::not_found(
                message_keys::TWILIO_TOKEN_NOT_FOUND,
            ));
        };

        Ok(decrypt_string(token, self.sms_encryption())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use smsgate_id::InstanceId;

    #[test]
    fn test_require_twilio_rejects_missing_provider() {
        let mut model = SmsConfigWriteModel::new(SmsConfigId::new(), InstanceId::new());
        model.state = SmsConfigState::Active;

        let err = require_twilio(&model).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.message_key(), message_keys::SMS_CONFIG_NOT_FOUND);
    }

    #[test]
    fn test_parse_config_id() {
        let id = SmsConfigId::new();
        assert_eq!(parse_config_id(&id.to_string()).unwrap(), id);

        let err = parse_config_id("").unwrap_err();
        assert_eq!(err.message_key(), message_keys::ID_MISSING);

        let err = parse_config_id("inst_01ARZ3NDEKTSV4RRFFQ69G5FAV").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.message_key(), message_keys::ID_INVALID);
    }

    #[test]
    fn test_require_rejects_blank() {
        assert!(require("AC1", message_keys::TWILIO_SID_MISSING).is_ok());
        let err = require("  ", message_keys::TWILIO_SID_MISSING).unwrap_err();
        assert_eq!(err.message_key(), message_keys::TWILIO_SID_MISSING);
    }

    #[test]
    fn test_twilio_config_debug_redacts_token() {
        let config = TwilioConfig {
            sid: "AC1".into(),
            sender_number: "+100".into(),
            token: Some("super-secret".into()),
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
