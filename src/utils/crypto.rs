use data_encoding::BASE64;
use ring::digest::{Context, SHA256};
use ring::rand::SystemRandom;
use ring::signature::{
    EcdsaKeyPair, KeyPair as _, UnparsedPublicKey, ECDSA_P256_SHA256_FIXED,
    ECDSA_P256_SHA256_FIXED_SIGNING,
};

use crate::error::{LedgerError, Result};
use std::time::{SystemTime, UNIX_EPOCH};

/// Nanoseconds since the Unix epoch, used as the transaction timestamp
pub fn current_timestamp() -> Result<i64> {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| LedgerError::Crypto(format!("System time error: {e}")))?
        .as_nanos();

    if duration > i64::MAX as u128 {
        return Err(LedgerError::Crypto("Timestamp overflow".to_string()));
    }

    Ok(duration as i64)
}

pub fn sha256_digest(data: &[u8]) -> Vec<u8> {
    let mut context = Context::new(&SHA256);
    context.update(data);
    let digest = context.finish();
    digest.as_ref().to_vec()
}

pub fn base64_encode(data: &[u8]) -> String {
    BASE64.encode(data)
}

pub fn base64_decode(data: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(data.as_bytes())
        .map_err(|e| LedgerError::Serialization(format!("Invalid base64 encoding: {e}")))
}

/// An ECDSA P-256 key pair: PKCS#8 secret document plus the SEC1 public key
#[derive(Clone)]
pub struct KeyPair {
    pkcs8: Vec<u8>,
    public_key: Vec<u8>,
}

impl KeyPair {
    pub fn generate() -> Result<KeyPair> {
        let rng = SystemRandom::new();
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, &rng)
            .map_err(|e| LedgerError::Crypto(format!("Failed to generate ECDSA key pair: {e}")))?
            .as_ref()
            .to_vec();
        Self::from_pkcs8(&pkcs8)
    }

    pub fn from_pkcs8(pkcs8: &[u8]) -> Result<KeyPair> {
        let rng = SystemRandom::new();
        let key_pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8, &rng)
            .map_err(|e| {
                LedgerError::Crypto(format!("Failed to create key pair from PKCS8: {e}"))
            })?;
        Ok(KeyPair {
            pkcs8: pkcs8.to_vec(),
            public_key: key_pair.public_key().as_ref().to_vec(),
        })
    }

    pub fn get_pkcs8(&self) -> &[u8] {
        self.pkcs8.as_slice()
    }

    pub fn get_public_key(&self) -> &[u8] {
        self.public_key.as_slice()
    }

    pub fn public_key_base64(&self) -> String {
        base64_encode(&self.public_key)
    }

    pub fn secret_key_base64(&self) -> String {
        base64_encode(&self.pkcs8)
    }
}

pub fn ecdsa_p256_sha256_sign(pkcs8: &[u8], message: &[u8]) -> Result<Vec<u8>> {
    let rng = SystemRandom::new();
    let key_pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8, &rng)
        .map_err(|e| LedgerError::Crypto(format!("Failed to create key pair from PKCS8: {e}")))?;
    let signature = key_pair
        .sign(&rng, message)
        .map_err(|e| LedgerError::Crypto(format!("Failed to sign message: {e}")))?
        .as_ref()
        .to_vec();
    Ok(signature)
}

pub fn ecdsa_p256_sha256_verify(public_key: &[u8], signature: &[u8], message: &[u8]) -> bool {
    let peer_public_key = UnparsedPublicKey::new(&ECDSA_P256_SHA256_FIXED, public_key);
    peer_public_key.verify(message, signature).is_ok()
}
