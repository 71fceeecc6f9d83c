//! Ed25519 key generation and encoding.

use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use safenode_types::{KeyPair, PrivateKey, PublicKey};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("private key must be 64 hex characters")]
    BadHex,

    #[error("public key is not a valid Ed25519 point")]
    InvalidPublicKey,
}

/// Generate a new Ed25519 key pair from a secure random source.
pub fn generate_keypair() -> KeyPair {
    let signing_key = SigningKey::generate(&mut OsRng);
    let verifying_key = signing_key.verifying_key();
    KeyPair {
        public: PublicKey(verifying_key.to_bytes()),
        private: PrivateKey(signing_key.to_bytes()),
    }
}

/// Derive the public key from a private key.
pub fn public_from_private(private: &PrivateKey) -> PublicKey {
    let signing_key = SigningKey::from_bytes(&private.0);
    PublicKey(signing_key.verifying_key().to_bytes())
}

/// Reconstruct a full key pair from a private key.
pub fn keypair_from_private(private: PrivateKey) -> KeyPair {
    let public = public_from_private(&private);
    KeyPair { public, private }
}

/// Derive a key pair from a 32-byte seed (deterministic).
pub fn keypair_from_seed(seed: &[u8; 32]) -> KeyPair {
    keypair_from_private(PrivateKey(*seed))
}

/// Whether the bytes decode to a usable Ed25519 verifying key.
pub fn is_valid_public_key(public: &PublicKey) -> bool {
    VerifyingKey::from_bytes(&public.0)
        .map(|key| !key.is_weak())
        .unwrap_or(false)
}

/// Parse an operator key from its hex form (as written by `genkey`).
pub fn private_key_from_hex(s: &str) -> Result<PrivateKey, KeyError> {
    let bytes = hex::decode(s.trim()).map_err(|_| KeyError::BadHex)?;
    let arr: [u8; 32] = bytes.try_into().map_err(|_| KeyError::BadHex)?;
    Ok(PrivateKey(arr))
}

/// Hex form of a private key.
pub fn private_key_to_hex(private: &PrivateKey) -> String {
    hex::encode(private.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_produces_valid_keypair() {
        let kp = generate_keypair();
        assert_ne!(kp.public.0, [0u8; 32]);
        assert!(is_valid_public_key(&kp.public));
    }

    #[test]
    fn keypair_from_seed_deterministic() {
        let kp1 = keypair_from_seed(&[42u8; 32]);
        let kp2 = keypair_from_seed(&[42u8; 32]);
        assert_eq!(kp1.public, kp2.public);
        assert_eq!(kp1.private.0, kp2.private.0);
    }

    #[test]
    fn different_seeds_produce_different_keys() {
        let kp1 = keypair_from_seed(&[1u8; 32]);
        let kp2 = keypair_from_seed(&[2u8; 32]);
        assert_ne!(kp1.public, kp2.public);
    }

    #[test]
    fn hex_roundtrip() {
        let kp = keypair_from_seed(&[7u8; 32]);
        let encoded = private_key_to_hex(&kp.private);
        let decoded = private_key_from_hex(&encoded).unwrap();
        assert_eq!(public_from_private(&decoded), kp.public);
    }

    #[test]
    fn bad_hex_is_rejected() {
        assert_eq!(private_key_from_hex("zz").err(), Some(KeyError::BadHex));
        assert_eq!(private_key_from_hex("abcd").err(), Some(KeyError::BadHex));
    }

    #[test]
    fn identity_point_is_not_a_valid_key() {
        let mut identity = [0u8; 32];
        identity[0] = 1;
        assert!(!is_valid_public_key(&PublicKey(identity)));
    }
}
