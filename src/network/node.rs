use crate::error::{LedgerError, Result};
use crate::network::server::{
    handshake_as_initiator, register_peer, run_listener, Identity, NodeContext,
};
use crate::network::{Dispatcher, PeerManager};
use crate::utils::serialize;
use log::{info, warn};
use serde::Serialize;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub const TCP_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolve `host:port`; a bare `:port` means every IPv4 interface
pub fn resolve_addr(addr: &str) -> Result<SocketAddr> {
    let normalized = if addr.starts_with(':') {
        format!("0.0.0.0{addr}")
    } else {
        addr.to_string()
    };
    normalized
        .to_socket_addrs()
        .map_err(|e| LedgerError::Network(format!("Failed to resolve {addr}: {e}")))?
        .find(|candidate| candidate.is_ipv4())
        .ok_or_else(|| LedgerError::Network(format!("No IPv4 address for {addr}")))
}

/// Peer-to-peer transport: a listener, a set of named peers, and the
/// handlers that every inbound message is delivered to.
pub struct Node {
    addr: String,
    ctx: NodeContext,
    local_addr: Mutex<Option<SocketAddr>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Node {
    pub fn new(name: &str, public_key: &str, addr: &str) -> Node {
        Node {
            addr: addr.to_string(),
            ctx: NodeContext {
                identity: Identity {
                    name: name.to_string(),
                    public_key: public_key.to_string(),
                },
                peers: Arc::new(PeerManager::new()),
                dispatcher: Arc::new(Dispatcher::new()),
                stopped: Arc::new(AtomicBool::new(false)),
            },
            local_addr: Mutex::new(None),
            listener: Mutex::new(None),
        }
    }

    pub fn get_name(&self) -> &str {
        self.ctx.identity.name.as_str()
    }

    pub fn get_public_key(&self) -> &str {
        self.ctx.identity.public_key.as_str()
    }

    /// Address the listener is bound to, once started
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.lock().ok().and_then(|addr| *addr)
    }

    /// Bind the listener and start accepting peers in the background
    pub fn start(&self) -> Result<SocketAddr> {
        let bind_addr = resolve_addr(&self.addr)?;
        let listener = TcpListener::bind(bind_addr).map_err(|e| {
            LedgerError::Network(format!("Failed to bind to {}: {e}", self.addr))
        })?;
        let local_addr = listener.local_addr()?;
        info!("{} listening on {local_addr}", self.get_name());

        if let Ok(mut slot) = self.local_addr.lock() {
            *slot = Some(local_addr);
        }

        let ctx = self.ctx.clone();
        let handle = thread::Builder::new()
            .name(format!("listen-{}", self.get_name()))
            .spawn(move || run_listener(listener, ctx))
            .map_err(|e| LedgerError::Network(format!("Failed to spawn listener: {e}")))?;
        if let Ok(mut slot) = self.listener.lock() {
            *slot = Some(handle);
        }
        Ok(local_addr)
    }

    /// Dial a peer, exchange names and keys, and start reading from it.
    /// Returns the name the peer announced.
    pub fn connect(&self, addr: &str) -> Result<String> {
        let socket_addr = resolve_addr(addr)?;
        let mut stream = TcpStream::connect_timeout(&socket_addr, TCP_CONNECT_TIMEOUT)
            .map_err(|e| LedgerError::Network(format!("Failed to connect to {addr}: {e}")))?;

        let peer = handshake_as_initiator(&mut stream, &self.ctx.identity)?;
        let name = peer.name.clone();
        info!("{} connected to {name} at {addr}", self.get_name());
        register_peer(&self.ctx, stream, peer)?;
        Ok(name)
    }

    /// Unicast a message to one named peer
    pub fn send<T: Serialize + ?Sized>(&self, party: &str, message: &T) -> Result<()> {
        let data = serialize(message)?;
        let party = self
            .ctx
            .peers
            .get(party)
            .ok_or_else(|| LedgerError::NoSuchParty(party.to_string()))?;
        party.write(&data)
    }

    /// Best-effort broadcast: serialize once, write to every known peer, and
    /// log (without retrying) any peer that fails.
    pub fn send_all<T: Serialize + ?Sized>(&self, message: &T) {
        let data = match serialize(message) {
            Ok(data) => data,
            Err(e) => {
                warn!("Failed to encode broadcast: {e}");
                return;
            }
        };
        for party in self.ctx.peers.all() {
            if let Err(e) = party.write(&data) {
                warn!("{e}");
            }
        }
    }

    /// Register a handler for every inbound payload from any peer
    pub fn read_any<F>(&self, handler: F)
    where
        F: Fn(&str, &[u8]) + Send + Sync + 'static,
    {
        self.ctx.dispatcher.register(Box::new(handler));
    }

    /// The connection manager, for handlers that need peer keys
    pub fn peers(&self) -> Arc<PeerManager> {
        Arc::clone(&self.ctx.peers)
    }

    pub fn public_key_of(&self, name: &str) -> Option<String> {
        self.ctx.peers.public_key_of(name)
    }

    pub fn peer_names(&self) -> Vec<String> {
        self.ctx.peers.names()
    }

    pub fn is_connected_to(&self, name: &str) -> bool {
        self.ctx.peers.contains(name)
    }

    pub fn is_stopped(&self) -> bool {
        self.ctx.is_stopped()
    }

    /// Close every peer connection and shut the listener down.
    /// Read loops end on their next read error.
    pub fn stop(&self) {
        if self.ctx.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        self.ctx.peers.close_all();

        // Wake the blocking accept so the listener sees the stop flag
        let handle = self.listener.lock().ok().and_then(|mut slot| slot.take());
        if let Some(handle) = handle {
            if let Some(mut addr) = self.local_addr() {
                if addr.ip().is_unspecified() {
                    addr.set_ip(std::net::Ipv4Addr::LOCALHOST.into());
                }
                let _ = TcpStream::connect_timeout(&addr, TCP_CONNECT_TIMEOUT);
            }
            if handle.join().is_err() {
                warn!("Listener thread for {} panicked", self.get_name());
            }
        }
        info!("{} stopped", self.get_name());
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        self.stop();
    }
}
