// A transaction moves `value` from one named party to another.
// The signature covers only the canonical string `from,to,value,time`, so the
// wire layout can change without invalidating signatures.

use crate::error::Result;
use crate::utils::{
    base64_decode, base64_encode, current_timestamp, ecdsa_p256_sha256_sign,
    ecdsa_p256_sha256_verify,
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    // "form" is what peers put on the wire for the sender; keep it for compatibility
    #[serde(rename = "form")]
    from: String,
    to: String,
    value: i64,
    time: i64,
    #[serde(rename = "sign", default)]
    signature: String,
}

impl Transaction {
    /// Build an unsigned transaction with an explicit timestamp
    pub fn new(from: &str, to: &str, value: i64, time: i64) -> Transaction {
        Transaction {
            from: from.to_string(),
            to: to.to_string(),
            value,
            time,
            signature: String::new(),
        }
    }

    /// Build an unsigned transaction stamped with the current time
    pub fn new_now(from: &str, to: &str, value: i64) -> Result<Transaction> {
        Ok(Self::new(from, to, value, current_timestamp()?))
    }

    pub fn get_from(&self) -> &str {
        self.from.as_str()
    }

    pub fn get_to(&self) -> &str {
        self.to.as_str()
    }

    pub fn get_value(&self) -> i64 {
        self.value
    }

    pub fn get_time(&self) -> i64 {
        self.time
    }

    pub fn get_signature(&self) -> &str {
        self.signature.as_str()
    }

    /// The exact string that is signed and verified
    pub fn canonical_encoding(&self) -> String {
        format!("{},{},{},{}", self.from, self.to, self.value, self.time)
    }

    /// Sign the canonical encoding with a PKCS#8 secret key
    pub fn sign(&mut self, pkcs8: &[u8]) -> Result<()> {
        let signature = ecdsa_p256_sha256_sign(pkcs8, self.canonical_encoding().as_bytes())?;
        self.signature = base64_encode(&signature);
        Ok(())
    }

    /// Same as [`Transaction::sign`] but with the base64 text form of the key
    pub fn sign_with_base64_key(&mut self, secret_key: &str) -> Result<()> {
        let pkcs8 = base64_decode(secret_key)?;
        self.sign(&pkcs8)
    }

    /// Check the signature against `from`'s public key (base64 text).
    ///
    /// Undecodable keys or signatures and signature mismatches all yield `false`.
    pub fn verify(&self, public_key: &str) -> bool {
        let Ok(public_key) = base64_decode(public_key) else {
            return false;
        };
        let Ok(signature) = base64_decode(&self.signature) else {
            return false;
        };
        ecdsa_p256_sha256_verify(
            &public_key,
            &signature,
            self.canonical_encoding().as_bytes(),
        )
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_encoding())
    }
}
