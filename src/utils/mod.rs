//! Utility functions and helpers
//!
//! The crypto adapter (digest, signing, key pairs), the base64 text codec
//! and the JSON message codec.

pub mod crypto;
pub mod serialization;

pub use crypto::{
    base64_decode, base64_encode, current_timestamp, ecdsa_p256_sha256_sign,
    ecdsa_p256_sha256_verify, sha256_digest, KeyPair,
};

pub use serialization::{deserialize, serialize};
