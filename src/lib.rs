//! # p2p-ledger - a minimal peer-to-peer proof-of-work ledger
//!
//! Independent nodes exchange signed transactions, race to mine blocks under
//! a hash puzzle, and each resolves the canonical chain locally by the
//! longest-chain rule.
//!
//! ## Layout
//! - `core/`: transactions, blocks, proof-of-work, the chain store
//! - `network/`: framed TCP transport, handshake, handler fan-out
//! - `roles/`: the consumer (follows the chain) and the miner
//! - `storage/`: the pending-transaction pool
//! - `config/`: node identity and settings
//! - `utils/`: crypto adapter and codecs
//! - `cli/`: command-line surface for running nodes
//!
//! ## Flow
//! A miner builds a candidate from its pending transactions on top of its
//! longest chain and searches nonces. When it finds one it appends the block
//! and broadcasts it; peers verify and append it, and any valid block that
//! arrives cancels a miner's attempt so it restarts on the new tip.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod network;
pub mod roles;
pub mod storage;
pub mod utils;

#[cfg(test)]
pub mod testnet;

// Re-export commonly used types for convenience
pub use cli::{Command, Opt};
pub use config::NodeConfig;
pub use crate::core::{Balances, Block, Blockchain, ProofOfWork, Transaction, DEFAULT_DIFFICULTY};
pub use error::{LedgerError, Result};
pub use network::{Envelope, Node};
pub use roles::{Consumer, Miner, MiningOutcome};
pub use storage::MemoryPool;
pub use utils::{base64_decode, base64_encode, current_timestamp, sha256_digest, KeyPair};
