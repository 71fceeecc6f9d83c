//! Cryptographic primitives for the safenode registry.
//!
//! - **Ed25519** for collateral and operational signatures
//! - **Blake2b-256** for message hashes and payment scores
//! - Payee identifiers derived from collateral public keys

pub mod hash;
pub mod keys;
pub mod payee;
pub mod sign;

pub use hash::{blake2b_256, blake2b_256_multi};
pub use keys::{
    generate_keypair, is_valid_public_key, keypair_from_private, keypair_from_seed,
    private_key_from_hex, private_key_to_hex, public_from_private, KeyError,
};
pub use payee::PayeeId;
pub use sign::{sign_message, verify_signature};
