//! # smsgate-events
//!
//! Event definitions for the SMS configuration aggregate.
//!
//! ## Design Principles
//!
//! - Events are immutable records of validated state transitions
//! - Events never contain secret values in clear form; provider tokens are
//!   embedded only as [`smsgate_crypto::CryptoValue`]
//! - Every event belongs to exactly one aggregate stream
//! - Events are versioned for schema evolution
//!
//! ## Event Types
//!
//! - `sms_config.twilio.added`
//! - `sms_config.twilio.changed`
//! - `sms_config.twilio.token_changed`
//! - `sms_config.twilio.activated`
//! - `sms_config.deactivated`
//! - `sms_config.removed`

mod envelope;
mod error;
mod types;

pub use envelope::*;
pub use error::EventError;
pub use types::*;
