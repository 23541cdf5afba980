//! Command error taxonomy.
//!
//! Every failure a command can return maps to one [`ErrorKind`] and a stable
//! message key that callers translate for display.

use smsgate_crypto::CryptoError;
use smsgate_events::EventError;
use thiserror::Error;

use crate::db::DbError;

/// Stable message keys.
pub mod message_keys {
    pub const ID_MISSING: &str = "Errors.IdMissing";
    pub const ID_INVALID: &str = "Errors.IdInvalid";
    pub const NO_CHANGES_FOUND: &str = "Errors.NoChangesFound";
    pub const CONCURRENT_MODIFICATION: &str = "Errors.ConcurrentModification";
    pub const ENCRYPTION_UNAVAILABLE: &str = "Errors.Crypto.NoActiveKey";
    pub const KEY_UNKNOWN: &str = "Errors.Crypto.KeyUnknown";
    pub const INTERNAL: &str = "Errors.Internal";

    pub const SMS_CONFIG_NOT_FOUND: &str = "Errors.SmsConfig.NotFound";
    pub const SMS_CONFIG_ALREADY_EXISTS: &str = "Errors.SmsConfig.AlreadyExists";
    pub const SMS_CONFIG_ALREADY_ACTIVE: &str = "Errors.SmsConfig.AlreadyActive";
    pub const SMS_CONFIG_ALREADY_DEACTIVATED: &str = "Errors.SmsConfig.AlreadyDeactivated";
    pub const TWILIO_SID_MISSING: &str = "Errors.SmsConfig.Twilio.SidMissing";
    pub const TWILIO_SENDER_NUMBER_MISSING: &str = "Errors.SmsConfig.Twilio.SenderNumberMissing";
    pub const TWILIO_TOKEN_MISSING: &str = "Errors.SmsConfig.Twilio.TokenMissing";
    pub const TWILIO_TOKEN_NOT_FOUND: &str = "Errors.SmsConfig.Twilio.TokenNotFound";
}

/// Coarse classification for callers (transport status mapping, retries).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    AlreadyExists,
    AlreadyInState,
    PreconditionFailed,
    ConcurrencyConflict,
    EncryptionUnavailable,
    KeyUnknown,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::NotFound => "not_found",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::AlreadyInState => "already_in_state",
            ErrorKind::PreconditionFailed => "precondition_failed",
            ErrorKind::ConcurrencyConflict => "concurrency_conflict",
            ErrorKind::EncryptionUnavailable => "encryption_unavailable",
            ErrorKind::KeyUnknown => "key_unknown",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("invalid argument: {message_key}")]
    InvalidArgument { message_key: &'static str },

    #[error("not found: {message_key}")]
    NotFound { message_key: &'static str },

    #[error("already exists: {message_key}")]
    AlreadyExists { message_key: &'static str },

    /// The transition would leave the state unchanged.
    #[error("already in requested state: {message_key}")]
    AlreadyInState { message_key: &'static str },

    #[error("precondition failed: {message_key}")]
    PreconditionFailed { message_key: &'static str },

    /// Another writer appended to the aggregate after it was loaded.
    #[error("concurrent modification of {aggregate_id}")]
    ConcurrencyConflict { aggregate_id: String },

    #[error("no active encryption key configured")]
    EncryptionUnavailable,

    #[error("encryption key '{key_id}' is not registered")]
    KeyUnknown { key_id: String },

    #[error("event store error: {0}")]
    Store(#[source] DbError),

    #[error("crypto error: {0}")]
    Crypto(#[source] CryptoError),

    #[error("event error: {0}")]
    Event(#[from] EventError),
}

impl CommandError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CommandError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            CommandError::NotFound { .. } => ErrorKind::NotFound,
            CommandError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            CommandError::AlreadyInState { .. } => ErrorKind::AlreadyInState,
            CommandError::PreconditionFailed { .. } => ErrorKind::PreconditionFailed,
            CommandError::ConcurrencyConflict { .. } => ErrorKind::ConcurrencyConflict,
            CommandError::EncryptionUnavailable => ErrorKind::EncryptionUnavailable,
            CommandError::KeyUnknown { .. } => ErrorKind::KeyUnknown,
            CommandError::Store(_) | CommandError::Crypto(_) | CommandError::Event(_) => {
                ErrorKind::Internal
            }
        }
    }

    pub fn message_key(&self) -> &'static str {
        match self {
            CommandError::InvalidArgument { message_key }
            | CommandError::NotFound { message_key }
            | CommandError::AlreadyExists { message_key }
            | CommandError::AlreadyInState { message_key }
            | CommandError::PreconditionFailed { message_key } => message_key,
            CommandError::ConcurrencyConflict { .. } => message_keys::CONCURRENT_MODIFICATION,
            CommandError::EncryptionUnavailable => message_keys::ENCRYPTION_UNAVAILABLE,
            CommandError::KeyUnknown { .. } => message_keys::KEY_UNKNOWN,
            CommandError::Store(_) | CommandError::Crypto(_) | CommandError::Event(_) => {
                message_keys::INTERNAL
            }
        }
    }

    pub(crate) fn invalid_argument(message_key: &'static str) -> Self {
        CommandError::InvalidArgument { message_key }
    }

    pub(crate) fn not_found(message_key: &'static str) -> Self {
        CommandError::NotFound { message_key }
    }

    pub(crate) fn already_in_state(message_key: &'static str) -> Self {
        CommandError::AlreadyInState { message_key }
    }

    pub(crate) fn precondition_failed(message_key: &'static str) -> Self {
        CommandError::PreconditionFailed { message_key }
    }
}

impl From<DbError> for CommandError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::SequenceConflict { aggregate_id, .. } => {
                CommandError::ConcurrencyConflict { aggregate_id }
            }
            other => CommandError::Store(other),
        }
    }
}

impl From<CryptoError> for CommandError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::NoActiveKey => CommandError::EncryptionUnavailable,
            CryptoError::UnknownKey(key_id) => CommandError::KeyUnknown { key_id },
            other => CommandError::Crypto(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_conflict_maps_to_concurrency_conflict() {
        let err: CommandError = DbError::SequenceConflict {
            aggregate_id: "sms_1".into(),
            expected: 1,
            actual: 2,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::ConcurrencyConflict);
        assert_eq!(err.message_key(), message_keys::CONCURRENT_MODIFICATION);
    }

    #[test]
    fn test_other_store_errors_are_internal() {
        let err: CommandError = DbError::InvalidBatch("gap".into()).into();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_crypto_error_mapping() {
        let err: CommandError = CryptoError::NoActiveKey.into();
        assert_eq!(err.kind(), ErrorKind::EncryptionUnavailable);

        let err: CommandError = CryptoError::UnknownKey("old".into()).into();
        assert!(matches!(&err, CommandError::KeyUnknown { key_id } if key_id == "old"));

        let err: CommandError = CryptoError::DecryptFailed.into();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_message_key_passthrough() {
        let err = CommandError::not_found(message_keys::SMS_CONFIG_NOT_FOUND);
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.message_key(), "Errors.SmsConfig.NotFound");
    }
}
