// JSON codec shared by the wire protocol and the chain tooling
use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};

/// Serialize a message into the JSON bytes carried inside one frame
pub fn serialize<T: Serialize + ?Sized>(data: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(data)
        .map_err(|e| LedgerError::Serialization(format!("Serialization failed: {e}")))
}

/// Deserialize the JSON bytes of one frame
pub fn deserialize<T>(bytes: &[u8]) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_slice(bytes)
        .map_err(|e| LedgerError::Serialization(format!("Deserialization failed: {e}")))
}
