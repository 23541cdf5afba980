//! AES-256-GCM keyring.
//!
//! Ciphertext layout: `nonce (12 bytes) || ciphertext+tag`. The key id is
//! bound as associated data, so a value relabelled with another key id fails
//! authentication instead of decrypting under the wrong key.

use std::collections::BTreeMap;

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use rand::RngCore;

use crate::{CryptoError, EncryptionAlgorithm, KeyringConfig};

/// Algorithm tag persisted with every value produced by [`AesGcmKeyring`].
pub const AES_256_GCM: &str = "aes-256-gcm";

pub(crate) const KEY_BYTES: usize = 32;
const NONCE_BYTES: usize = 12;
const AAD_PREFIX: &[u8] = b"smsgate-secret-v1:";

/// Registered keys plus the single key used for new encryptions.
#[derive(Clone)]
pub struct AesGcmKeyring {
    keys: BTreeMap<String, [u8; KEY_BYTES]>,
    active_key_id: Option<String>,
}

impl std::fmt::Debug for AesGcmKeyring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesGcmKeyring")
            .field("key_ids", &self.keys.keys().collect::<Vec<_>>())
            .field("active_key_id", &self.active_key_id)
            .finish()
    }
}

impl AesGcmKeyring {
    /// Builds a keyring. The active key, if any, must be one of `keys`.
    pub fn new<I>(keys: I, active_key_id: Option<String>) -> Result<Self, CryptoError>
    where
        I: IntoIterator<Item = (String, [u8; KEY_BYTES])>,
    {
        let mut registered = BTreeMap::new();
        for (id, key) in keys {
            if registered.insert(id.clone(), key).is_some() {
                return Err(CryptoError::DuplicateKey(id));
            }
        }

        if let Some(active) = &active_key_id {
            if !registered.contains_key(active) {
                return Err(CryptoError::UnknownKey(active.clone()));
            }
        }

        Ok(Self {
            keys: registered,
            active_key_id,
        })
    }

    pub fn from_config(config: &KeyringConfig) -> Result<Self, CryptoError> {
        Self::new(
            config
                .keys
                .iter()
                .map(|entry| (entry.id.clone(), *entry.key_bytes())),
            config.active_key_id.clone(),
        )
    }

    fn cipher(&self, key_id: &str) -> Result<Aes256Gcm, CryptoError> {
        let key = self
            .keys
            .get(key_id)
            .ok_or_else(|| CryptoError::UnknownKey(key_id.to_string()))?;
        Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::InvalidKey(key_id.to_string()))
    }
}

fn associated_data(key_id: &str) -> Vec<u8> {
    let mut aad = Vec::with_capacity(AAD_PREFIX.len() + key_id.len());
    aad.extend_from_slice(AAD_PREFIX);
    aad.extend_from_slice(key_id.as_bytes());
    aad
}

impl EncryptionAlgorithm for AesGcmKeyring {
    fn algorithm(&self) -> &str {
        AES_256_GCM
    }

    fn encryption_key_id(&self) -> Option<&str> {
        self.active_key_id.as_deref()
    }

    fn decryption_key_ids(&self) -> Vec<String> {
        self.keys.keys().cloned().collect()
    }

    fn encrypt(&self, plaintext: &[u8]) -> Result<(Vec<u8>, String), CryptoError> {
        let key_id = self
            .active_key_id
            .as_deref()
            .ok_or(CryptoError::NoActiveKey)?;
        let cipher = self.cipher(key_id)?;

        let mut nonce_bytes = [0u8; NONCE_BYTES];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let aad = associated_data(key_id);
        let sealed = cipher
            .encrypt(
                nonce,
                Payload {
                    msg: plaintext,
                    aad: &aad,
                },
            )
            .map_err(|_| CryptoError::EncryptFailed)?;

        let mut out = Vec::with_capacity(NONCE_BYTES + sealed.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&sealed);
        Ok((out, key_id.to_string()))
    }

    fn decrypt(&self, ciphertext: &[u8], key_id: &str) -> Result<Vec<u8>, CryptoError> {
        let cipher = self.cipher(key_id)?;
        if ciphertext.len() < NONCE_BYTES {
            return Err(CryptoError::DecryptFailed);
        }

        let (nonce_bytes, sealed) = ciphertext.split_at(NONCE_BYTES);
        let aad = associated_data(key_id);
        cipher
            .decrypt(
                Nonce::from_slice(nonce_bytes),
                Payload {
                    msg: sealed,
                    aad: &aad,
                },
            )
            .map_err(|_| CryptoError::DecryptFailed)
    }
}
