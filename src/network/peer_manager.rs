use crate::error::{LedgerError, Result};
use crate::network::framing::write_frame;
use log::{info, warn};
use std::collections::HashMap;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::{Arc, Mutex, RwLock};

/// A named peer with the public key it announced and the write half of its
/// connection. Identity is whatever the peer asserted during the handshake.
pub struct Party {
    name: String,
    public_key: String,
    address: Option<SocketAddr>,
    writer: Mutex<TcpStream>,
}

impl Party {
    pub fn new(name: String, public_key: String, stream: TcpStream) -> Party {
        let address = stream.peer_addr().ok();
        Party {
            name,
            public_key,
            address,
            writer: Mutex::new(stream),
        }
    }

    pub fn get_name(&self) -> &str {
        self.name.as_str()
    }

    pub fn get_public_key(&self) -> &str {
        self.public_key.as_str()
    }

    pub fn get_address(&self) -> Option<SocketAddr> {
        self.address
    }

    /// Write one frame; frames from concurrent senders never interleave
    pub fn write(&self, payload: &[u8]) -> Result<()> {
        let mut stream = self
            .writer
            .lock()
            .map_err(|e| LedgerError::Network(format!("Failed to acquire writer lock: {e}")))?;
        write_frame(&mut *stream, payload)
            .map_err(|e| LedgerError::Network(format!("Failed to write to {}: {e}", self.name)))
    }

    pub fn close(&self) {
        if let Ok(stream) = self.writer.lock() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

/// Connection manager: one live connection per peer name
#[derive(Default)]
pub struct PeerManager {
    parties: RwLock<HashMap<String, Arc<Party>>>,
}

impl PeerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a party, replacing and closing any earlier connection
    /// under the same name
    pub fn register(&self, party: Arc<Party>) -> Result<()> {
        let mut parties = self
            .parties
            .write()
            .map_err(|e| LedgerError::Network(format!("Failed to acquire peer lock: {e}")))?;

        let name = party.get_name().to_string();
        if let Some(previous) = parties.insert(name.clone(), party) {
            warn!("Replacing existing connection to {name}");
            previous.close();
        }
        info!("Registered party {name}");
        Ok(())
    }

    /// Drop `party` if it is still the registered connection for its name
    pub fn remove_if_current(&self, party: &Arc<Party>) {
        if let Ok(mut parties) = self.parties.write() {
            let current = parties
                .get(party.get_name())
                .is_some_and(|registered| Arc::ptr_eq(registered, party));
            if current {
                parties.remove(party.get_name());
                info!("Disconnected from party {}", party.get_name());
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<Party>> {
        self.parties.read().ok()?.get(name).cloned()
    }

    pub fn public_key_of(&self, name: &str) -> Option<String> {
        self.get(name).map(|party| party.get_public_key().to_string())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Snapshot of the current parties, so writes happen without the map lock
    pub fn all(&self) -> Vec<Arc<Party>> {
        self.parties
            .read()
            .map(|parties| parties.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .parties
            .read()
            .map(|parties| parties.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.parties.read().map(|parties| parties.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close every connection and forget all parties
    pub fn close_all(&self) {
        let drained: Vec<Arc<Party>> = match self.parties.write() {
            Ok(mut parties) => parties.drain().map(|(_, party)| party).collect(),
            Err(_) => return,
        };
        for party in drained {
            party.close();
        }
    }
}
