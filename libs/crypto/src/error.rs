//! Error types for encryption and key configuration.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// No active key is configured, so nothing can be encrypted.
    #[error("no active encryption key configured (set SMSGATE_SMS_ACTIVE_KEY_ID)")]
    NoActiveKey,

    /// The ciphertext references a key that is not registered.
    #[error("unknown encryption key id: {0}")]
    UnknownKey(String),

    /// The ciphertext was produced by another algorithm.
    #[error("algorithm mismatch: expected {expected}, got {actual}")]
    AlgorithmMismatch { expected: String, actual: String },

    /// A configured key is malformed.
    #[error("invalid encryption key '{0}'")]
    InvalidKey(String),

    /// The same key id was configured twice.
    #[error("duplicate encryption key id: {0}")]
    DuplicateKey(String),

    #[error("encryption failed")]
    EncryptFailed,

    #[error("decryption failed")]
    DecryptFailed,

    #[error("decrypted value is not valid UTF-8")]
    InvalidUtf8,
}
