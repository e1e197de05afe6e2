//! In-memory storage
//!
//! The pending-transaction pool a miner draws its candidate blocks from.
//! Nothing is persisted across restarts.

pub mod memory_pool;

pub use memory_pool::MemoryPool;
