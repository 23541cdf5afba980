//! # smsgate-crypto
//!
//! Encryption boundary for secret fields (provider tokens) that are stored
//! inside events.
//!
//! - [`EncryptionAlgorithm`] is the pluggable seam: one active key for new
//!   encryptions, any number of registered keys for decryption.
//! - [`AesGcmKeyring`] is the production implementation (AES-256-GCM).
//! - [`CryptoValue`] is the persisted `{algorithm, key_id, crypted}` triple.
//!   Old values keep the key id they were written under, so rotating the
//!   active key never requires rewriting history.

mod aes;
mod config;
mod error;
mod value;

pub use aes::{AesGcmKeyring, AES_256_GCM};
pub use config::{KeyEntry, KeyringConfig};
pub use error::CryptoError;
pub use value::{decrypt, decrypt_string, encrypt, CryptoValue};

/// A keyed symmetric encryption algorithm.
///
/// Implementations hold read-only key material and must be safe to share
/// across concurrent callers.
pub trait EncryptionAlgorithm: Send + Sync + std::fmt::Debug {
    /// Stable algorithm tag persisted next to every ciphertext.
    fn algorithm(&self) -> &str;

    /// Key used for new encryptions, if one is configured.
    fn encryption_key_id(&self) -> Option<&str>;

    /// All key ids that can currently be used for decryption.
    fn decryption_key_ids(&self) -> Vec<String>;

    /// Encrypts under the active key, returning the ciphertext and the key id.
    fn encrypt(&self, plaintext: &[u8]) -> Result<(Vec<u8>, String), CryptoError>;

    fn decrypt(&self, ciphertext: &[u8], key_id: &str) -> Result<Vec<u8>, CryptoError>;

    fn decrypt_string(&self, ciphertext: &[u8], key_id: &str) -> Result<String, CryptoError> {
        let plaintext = self.decrypt(ciphertext, key_id)?;
        String::from_utf8(plaintext).map_err(|_| CryptoError::InvalidUtf8)
    }
}
