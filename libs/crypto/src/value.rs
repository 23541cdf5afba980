//! The encrypted value persisted inside event payloads.

use serde::{Deserialize, Serialize};

use crate::{CryptoError, EncryptionAlgorithm};

/// Ciphertext plus everything needed to pick the key that decrypts it.
///
/// Serialized as `{"algorithm": ..., "key_id": ..., "crypted": "<base64>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoValue {
    pub algorithm: String,
    pub key_id: String,
    #[serde(with = "base64_bytes")]
    pub crypted: Vec<u8>,
}

/// Encrypts `value` under the algorithm's active key.
pub fn encrypt(value: &[u8], alg: &dyn EncryptionAlgorithm) -> Result<CryptoValue, CryptoError> {
    let (crypted, key_id) = alg.encrypt(value)?;
    Ok(CryptoValue {
        algorithm: alg.algorithm().to_string(),
        key_id,
        crypted,
    })
}

fn check_decryptable(value: &CryptoValue, alg: &dyn EncryptionAlgorithm) -> Result<(), CryptoError> {
    if value.algorithm != alg.algorithm() {
        return Err(CryptoError::AlgorithmMismatch {
            expected: alg.algorithm().to_string(),
            actual: value.algorithm.clone(),
        });
    }
    if !alg.decryption_key_ids().contains(&value.key_id) {
        return Err(CryptoError::UnknownKey(value.key_id.clone()));
    }
    Ok(())
}

pub fn decrypt(value: &CryptoValue, alg: &dyn EncryptionAlgorithm) -> Result<Vec<u8>, CryptoError> {
    check_decryptable(value, alg)?;
    alg.decrypt(&value.crypted, &value.key_id)
}

pub fn decrypt_string(
    value: &CryptoValue,
    alg: &dyn EncryptionAlgorithm,
) -> Result<String, CryptoError> {
    check_decryptable(value, alg)?;
    alg.decrypt_string(&value.crypted, &value.key_id)
}

mod base64_bytes {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(s)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AesGcmKeyring;
    use proptest::prelude::*;

    fn ring(keys: &[(&str, u8)], active: Option<&str>) -> AesGcmKeyring {
        AesGcmKeyring::new(
            keys.iter().map(|(id, b)| (id.to_string(), [*b; 32])),
            active.map(str::to_string),
        )
        .unwrap()
    }

    #[test]
    fn test_value_records_active_key_and_algorithm() {
        let alg = ring(&[("k1", 1)], Some("k1"));
        let value = encrypt(b"token", &alg).unwrap();
        assert_eq!(value.key_id, "k1");
        assert_eq!(value.algorithm, "aes-256-gcm");
        assert_eq!(decrypt_string(&value, &alg).unwrap(), "token");
    }

    #[test]
    fn test_retired_key_still_decrypts_after_rotation() {
        let before = ring(&[("k1", 1)], Some("k1"));
        let old_value = encrypt(b"old-token", &before).unwrap();

        let after = ring(&[("k1", 1), ("k2", 2)], Some("k2"));
        let new_value = encrypt(b"new-token", &after).unwrap();

        assert_eq!(new_value.key_id, "k2");
        assert_eq!(decrypt_string(&old_value, &after).unwrap(), "old-token");
        assert_eq!(decrypt_string(&new_value, &after).unwrap(), "new-token");
    }

    #[test]
    fn test_unregistered_key_is_reported() {
        let before = ring(&[("k1", 1)], Some("k1"));
        let value = encrypt(b"token", &before).unwrap();

        let revoked = ring(&[("k2", 2)], Some("k2"));
        assert_eq!(
            decrypt(&value, &revoked).unwrap_err(),
            CryptoError::UnknownKey("k1".into())
        );
    }

    #[test]
    fn test_algorithm_mismatch() {
        let alg = ring(&[("k1", 1)], Some("k1"));
        let mut value = encrypt(b"token", &alg).unwrap();
        value.algorithm = "rsa".into();
        assert!(matches!(
            decrypt(&value, &alg).unwrap_err(),
            CryptoError::AlgorithmMismatch { .. }
        ));
    }

    #[test]
    fn test_json_shape() {
        let value = CryptoValue {
            algorithm: "aes-256-gcm".into(),
            key_id: "k1".into(),
            crypted: vec![0xde, 0xad, 0xbe, 0xef],
        };
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"algorithm": "aes-256-gcm", "key_id": "k1", "crypted": "3q2+7w=="})
        );
        let parsed: CryptoValue = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, value);
    }

    proptest! {
        #[test]
        fn prop_decrypt_inverts_encrypt(secret in ".{0,64}") {
            let alg = ring(&[("k1", 1)], Some("k1"));
            let value = encrypt(secret.as_bytes(), &alg).unwrap();
            prop_assert_eq!(decrypt_string(&value, &alg).unwrap(), secret);
        }
    }
}
