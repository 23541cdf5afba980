//! smsgate command engine library.
//!
//! Event-sourced commands for tenant SMS provider configuration. The crate
//! ships the `smsgate` admin binary and exposes the engine as a library so it
//! can be embedded and integration tested.

pub mod command;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod id_generator;
pub mod write_model;

pub use command::{Commands, TwilioConfig, TwilioConfigChange};
pub use context::{CommandContext, ObjectDetails};
pub use error::{CommandError, ErrorKind};
