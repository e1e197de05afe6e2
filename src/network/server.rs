// Connection workers: the accept loop, the name/key handshake and the
// per-peer read loop that feeds the dispatcher.

use crate::error::{LedgerError, Result};
use crate::network::framing::{read_frame, write_frame};
use crate::network::{Dispatcher, Party, PeerManager};
use log::{debug, error, info, warn};
use std::io::ErrorKind;
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
pub const TCP_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// What a node announces about itself during the handshake
#[derive(Debug, Clone)]
pub struct Identity {
    pub name: String,
    pub public_key: String,
}

/// Shared state handed to every worker thread
#[derive(Clone)]
pub struct NodeContext {
    pub identity: Identity,
    pub peers: Arc<PeerManager>,
    pub dispatcher: Arc<Dispatcher>,
    pub stopped: Arc<AtomicBool>,
}

impl NodeContext {
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

fn read_text(stream: &mut TcpStream, what: &str) -> Result<String> {
    let bytes = read_frame(stream)
        .map_err(|e| LedgerError::Handshake(format!("Failed to read peer {what}: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| LedgerError::Handshake(format!("Peer {what} is not UTF-8: {e}")))
}

fn send_identity(stream: &mut TcpStream, identity: &Identity) -> Result<()> {
    write_frame(stream, identity.name.as_bytes())
        .and_then(|_| write_frame(stream, identity.public_key.as_bytes()))
        .map_err(|e| LedgerError::Handshake(format!("Failed to send identity: {e}")))
}

fn receive_identity(stream: &mut TcpStream) -> Result<Identity> {
    let name = read_text(stream, "name")?;
    let public_key = read_text(stream, "public key")?;
    if name.is_empty() {
        return Err(LedgerError::Handshake("Peer announced an empty name".to_string()));
    }
    Ok(Identity { name, public_key })
}

/// Dialing side: send our name and key, then read theirs
pub fn handshake_as_initiator(stream: &mut TcpStream, identity: &Identity) -> Result<Identity> {
    stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT))?;
    send_identity(stream, identity)?;
    let peer = receive_identity(stream)?;
    stream.set_read_timeout(None)?;
    Ok(peer)
}

/// Accepting side: read their name and key, then reply with ours
pub fn handshake_as_acceptor(stream: &mut TcpStream, identity: &Identity) -> Result<Identity> {
    stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT))?;
    let peer = receive_identity(stream)?;
    send_identity(stream, identity)?;
    stream.set_read_timeout(None)?;
    Ok(peer)
}

/// Register the peer and start its read loop on a dedicated thread
pub fn register_peer(ctx: &NodeContext, stream: TcpStream, peer: Identity) -> Result<()> {
    stream.set_write_timeout(Some(TCP_WRITE_TIMEOUT))?;
    let reader = stream.try_clone()?;
    let party = Arc::new(Party::new(peer.name, peer.public_key, stream));
    ctx.peers.register(Arc::clone(&party))?;

    // Checked after registering: a concurrent stop either sees this party in
    // close_all or is seen here
    if ctx.is_stopped() {
        ctx.peers.remove_if_current(&party);
        party.close();
        return Err(LedgerError::Network(format!(
            "{} is stopped; dropping {}",
            ctx.identity.name,
            party.get_name()
        )));
    }

    let ctx = ctx.clone();
    thread::Builder::new()
        .name(format!("read-{}", party.get_name()))
        .spawn(move || read_loop(ctx, party, reader))
        .map_err(|e| LedgerError::Network(format!("Failed to spawn reader thread: {e}")))?;
    Ok(())
}

// Runs for the connection's lifetime. A read error ends the loop: after a
// failed read the framing can no longer be trusted.
fn read_loop(ctx: NodeContext, party: Arc<Party>, mut stream: TcpStream) {
    loop {
        match read_frame(&mut stream) {
            Ok(data) => {
                debug!("Received {} bytes from {}", data.len(), party.get_name());
                ctx.dispatcher.dispatch(party.get_name(), &data);
            }
            Err(e) => {
                if !ctx.is_stopped() {
                    warn!("Connection to {} closed: {e}", party.get_name());
                }
                break;
            }
        }
    }
    ctx.peers.remove_if_current(&party);
}

fn accept_connection(ctx: NodeContext, mut stream: TcpStream) {
    let peer_addr = stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "<unknown>".to_string());

    let result = handshake_as_acceptor(&mut stream, &ctx.identity)
        .and_then(|peer| {
            info!("Accepted {} from {peer_addr}", peer.name);
            register_peer(&ctx, stream, peer)
        });
    if let Err(e) = result {
        error!("Error handling connection from {peer_addr}: {e}");
    }
}

/// Accept loop; exits once the stop flag is set and the listener is woken
pub fn run_listener(listener: TcpListener, ctx: NodeContext) {
    for stream in listener.incoming() {
        if ctx.is_stopped() {
            break;
        }
        match stream {
            Ok(stream) => {
                let worker_ctx = ctx.clone();
                let spawned = thread::Builder::new()
                    .name("handshake".to_string())
                    .spawn(move || accept_connection(worker_ctx, stream));
                if let Err(e) = spawned {
                    error!("Failed to spawn connection thread: {e}");
                }
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                error!("Error accepting connection: {e}");
                if ctx.is_stopped() {
                    break;
                }
            }
        }
    }
    info!("Listener for {} stopped", ctx.identity.name);
}
