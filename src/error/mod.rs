//! Error handling for the ledger node
//!
//! One error enum covers transport, crypto, codec and configuration failures.
//! Validation failures (bad signatures, bad proof-of-work) are not errors:
//! they are dropped locally and never reported to the sending peer.

use std::fmt;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Error types for ledger and transport operations
#[derive(Debug, Clone)]
pub enum LedgerError {
    /// Resolve/listen/dial/read/write failures
    Network(String),
    /// Key decoding, signing or key generation failures
    Crypto(String),
    /// JSON or base64 encoding/decoding errors
    Serialization(String),
    /// File and socket I/O errors
    Io(String),
    /// Configuration errors
    Config(String),
    /// Unicast to a peer name that is not connected
    NoSuchParty(String),
    /// Frame length over the transport limit
    FrameTooLarge(usize),
    /// Peer did not complete the name/key exchange
    Handshake(String),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::Network(msg) => write!(f, "Network error: {msg}"),
            LedgerError::Crypto(msg) => write!(f, "Cryptographic error: {msg}"),
            LedgerError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            LedgerError::Io(msg) => write!(f, "I/O error: {msg}"),
            LedgerError::Config(msg) => write!(f, "Configuration error: {msg}"),
            LedgerError::NoSuchParty(name) => write!(f, "No such party: {name}"),
            LedgerError::FrameTooLarge(len) => {
                write!(f, "Frame of {len} bytes exceeds the transport limit")
            }
            LedgerError::Handshake(msg) => write!(f, "Handshake failed: {msg}"),
        }
    }
}

impl std::error::Error for LedgerError {}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for LedgerError {
    fn from(err: toml::de::Error) -> Self {
        LedgerError::Config(err.to_string())
    }
}
