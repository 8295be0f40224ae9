//! Utility functions and helpers
//!
//! Hashing, key generation, ECDSA signing and the binary encoding shared by
//! storage and the wire protocol.

pub mod crypto;
pub mod serialization;

pub use crypto::{
    current_timestamp, ecdsa_p256_sha256_sign_digest, ecdsa_p256_sha256_sign_verify,
    new_key_pair, sha256_digest, signature_from_hex, signature_to_hex, signing_key,
    P256_SCALAR_LEN,
};

pub use serialization::{deserialize, serialize};
