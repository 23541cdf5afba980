//! Keyring configuration.
//!
//! Keys come from the environment:
//! - `SMSGATE_SMS_KEYS`: comma-separated `id:base64key` entries; a bare
//!   base64 key gets an id derived from its SHA-256 digest
//! - `SMSGATE_SMS_KEYS_FILE`: same format, read from a file
//! - `SMSGATE_SMS_ACTIVE_KEY_ID`: key used for new encryptions
//!
//! Retired keys stay listed so existing ciphertexts remain readable; only the
//! active key changes on rotation.

use std::fs;

use base64::Engine;
use sha2::{Digest, Sha256};

use crate::aes::KEY_BYTES;
use crate::CryptoError;

/// One configured key.
#[derive(Clone)]
pub struct KeyEntry {
    pub id: String,
    key_bytes: [u8; KEY_BYTES],
}

impl std::fmt::Debug for KeyEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyEntry")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl KeyEntry {
    pub fn new(id: impl Into<String>, key_bytes: [u8; KEY_BYTES]) -> Self {
        Self {
            id: id.into(),
            key_bytes,
        }
    }

    pub(crate) fn key_bytes(&self) -> &[u8; KEY_BYTES] {
        &self.key_bytes
    }
}

#[derive(Debug, Clone, Default)]
pub struct KeyringConfig {
    pub keys: Vec<KeyEntry>,
    pub active_key_id: Option<String>,
}

fn key_id_for_bytes(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(digest)[..8].to_string()
}

fn decode_key(label: &str, raw: &str) -> Result<[u8; KEY_BYTES], CryptoError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(raw.trim())
        .map_err(|_| CryptoError::InvalidKey(label.to_string()))?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::InvalidKey(label.to_string()))
}

impl KeyringConfig {
    /// Parses a key list.
    ///
    /// Without an explicit `active_key_id` a single configured key becomes
    /// active; with several keys none is, and encryption is refused until one
    /// is chosen.
    pub fn parse(keys: &str, active_key_id: Option<String>) -> Result<Self, CryptoError> {
        let mut entries = Vec::new();
        for (index, raw) in keys
            .split([',', '\n'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .enumerate()
        {
            let entry = match raw.split_once(':') {
                Some((id, key)) => {
                    let id = id.trim();
                    if id.is_empty() {
                        return Err(CryptoError::InvalidKey(format!("#{index}")));
                    }
                    KeyEntry::new(id, decode_key(id, key)?)
                }
                None => {
                    let key_bytes = decode_key(&format!("#{index}"), raw)?;
                    KeyEntry::new(key_id_for_bytes(&key_bytes), key_bytes)
                }
            };
            entries.push(entry);
        }

        let active_key_id = active_key_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .or_else(|| match entries.as_slice() {
                [only] => Some(only.id.clone()),
                _ => None,
            });

        Ok(Self {
            keys: entries,
            active_key_id,
        })
    }

    /// Loads the keyring configuration from the environment.
    ///
    /// Having no keys at all is valid: the engine starts, and only commands
    /// that must encrypt a secret fail.
    pub fn from_env() -> Result<Self, CryptoError> {
        let active_key_id = std::env::var("SMSGATE_SMS_ACTIVE_KEY_ID").ok();

        if let Ok(raw) = std::env::var("SMSGATE_SMS_KEYS") {
            return Self::parse(&raw, active_key_id);
        }

        if let Ok(path) = std::env::var("SMSGATE_SMS_KEYS_FILE") {
            let contents = fs::read_to_string(&path)
                .map_err(|_| CryptoError::InvalidKey(format!("file {path}")))?;
            return Self::parse(&contents, active_key_id);
        }

        Ok(Self {
            keys: Vec::new(),
            active_key_id: None,
        })
    }
}
