//! Node roles
//!
//! A [`Consumer`] follows the chain and originates transactions; a [`Miner`]
//! additionally collects transactions and competes to extend the chain.

pub mod consumer;
pub mod miner;

pub use consumer::Consumer;
pub use miner::{Miner, MiningEpoch, MiningOutcome};
