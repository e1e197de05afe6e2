//! Peer-to-peer networking
//!
//! TCP transport between named nodes: a handshake that exchanges names and
//! public keys, length-prefixed frames, a per-peer read loop feeding shared
//! handlers, and unicast/broadcast sends of JSON envelopes.

pub mod dispatcher;
pub mod framing;
pub mod message;
pub mod node;
pub mod peer_manager;
pub mod server;

pub use dispatcher::{Dispatcher, Handler};
pub use message::Envelope;
pub use node::{resolve_addr, Node};
pub use peer_manager::{Party, PeerManager};
pub use server::Identity;
