//! Core ledger functionality
//!
//! Transactions, blocks, the proof-of-work puzzle and the chain store with
//! longest-chain selection and balance snapshots.

pub mod block;
pub mod blockchain;
pub mod proof_of_work;
pub mod transaction;

pub use block::Block;
pub use blockchain::{Balances, Blockchain};
pub use proof_of_work::{ProofOfWork, DEFAULT_DIFFICULTY, MAX_DIFFICULTY};
pub use transaction::Transaction;
