use anyhow::{Context, Result};
use smsgate_crypto::KeyringConfig;

use crate::db::DbConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub database: DbConfig,
    /// Keys for encrypting SMS provider tokens.
    pub sms_keys: KeyringConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let log_level = std::env::var("SMSGATE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let database = DbConfig::from_env();

        let sms_keys = KeyringConfig::from_env().context("invalid SMS encryption key configuration")?;

        Ok(Self {
            log_level,
            database,
            sms_keys,
        })
    }
}
