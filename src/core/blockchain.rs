// In-memory chain store: block hash -> (block, balance snapshot).
// Blocks are only ever inserted; every fork is kept and the longest path back
// to an implicit root decides which one is canonical.

use crate::core::Block;
use log::{debug, error};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Party name -> net balance
pub type Balances = HashMap<String, i64>;

#[derive(Debug, Clone)]
struct BlockEntry {
    block: Block,
    balances: Balances,
}

#[derive(Clone, Default)]
pub struct Blockchain {
    blocks: Arc<RwLock<HashMap<String, BlockEntry>>>,
}

impl Blockchain {
    pub fn new() -> Blockchain {
        Blockchain::default()
    }

    /// Insert a block keyed by its hash, folding its transactions into the
    /// parent's balances. A missing parent counts as an empty root snapshot.
    /// Balances wrap on overflow rather than rejecting the block.
    ///
    /// The block is not verified here; callers check proof-of-work first.
    pub fn append(&self, block: Block) {
        let mut blocks = match self.blocks.write() {
            Ok(blocks) => blocks,
            Err(_) => {
                error!("Failed to acquire write lock on chain store");
                return;
            }
        };

        let mut balances = if block.is_root() {
            Balances::new()
        } else {
            blocks
                .get(block.get_prev_hash())
                .map(|parent| parent.balances.clone())
                .unwrap_or_default()
        };
        for tx in block.get_transactions() {
            let from = balances.entry(tx.get_from().to_string()).or_insert(0);
            *from = from.wrapping_sub(tx.get_value());
            let to = balances.entry(tx.get_to().to_string()).or_insert(0);
            *to = to.wrapping_add(tx.get_value());
        }

        debug!("Appending {block}");
        let hash = block.get_hash().to_string();
        blocks.insert(hash, BlockEntry { block, balances });
    }

    /// Hash of the block with the most stored ancestors, or an empty string
    /// when the store is empty.
    ///
    /// Equal-depth forks are not resolved: the first one enumerated wins, and
    /// enumeration order is arbitrary, so two nodes may disagree until one
    /// branch grows longer.
    pub fn longest(&self) -> String {
        let blocks = match self.blocks.read() {
            Ok(blocks) => blocks,
            Err(_) => {
                error!("Failed to acquire read lock on chain store");
                return String::new();
            }
        };

        let mut depths: HashMap<&str, usize> = HashMap::with_capacity(blocks.len());
        let mut best_hash = "";
        let mut best_depth = 0usize;
        for hash in blocks.keys() {
            let depth = Self::depth_of(&blocks, hash, &mut depths);
            if depth > best_depth {
                best_hash = hash.as_str();
                best_depth = depth;
            } else if depth == best_depth {
                debug!("Longest-chain tie at depth {depth}: keeping {best_hash}, skipping {hash}");
            }
        }
        best_hash.to_string()
    }

    // Number of stored blocks on the path from `hash` back to the root
    fn depth_of<'a>(
        blocks: &'a HashMap<String, BlockEntry>,
        hash: &'a str,
        depths: &mut HashMap<&'a str, usize>,
    ) -> usize {
        let mut path: Vec<&'a str> = Vec::new();
        let mut cursor = hash;
        let mut base = 0;
        while let Some((key, entry)) = blocks.get_key_value(cursor) {
            if let Some(known) = depths.get(key.as_str()) {
                base = *known;
                break;
            }
            // A cycle can only come from a hash collision; stop walking
            if path.len() > blocks.len() {
                break;
            }
            path.push(key.as_str());
            cursor = entry.block.get_prev_hash();
            if cursor.is_empty() {
                break;
            }
        }
        for (i, key) in path.iter().rev().enumerate() {
            depths.insert(key, base + i + 1);
        }
        depths.get(hash).copied().unwrap_or(base)
    }

    /// Snapshot stored at `hash`
    pub fn balances(&self, hash: &str) -> Option<Balances> {
        let blocks = self.blocks.read().ok()?;
        blocks.get(hash).map(|entry| entry.balances.clone())
    }

    /// Balances under the current longest chain; empty before any block
    pub fn longest_balances(&self) -> Balances {
        self.balances(&self.longest()).unwrap_or_default()
    }

    pub fn get_block(&self, hash: &str) -> Option<Block> {
        let blocks = self.blocks.read().ok()?;
        blocks.get(hash).map(|entry| entry.block.clone())
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.blocks
            .read()
            .map(|blocks| blocks.contains_key(hash))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.blocks.read().map(|blocks| blocks.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Blocks from `hash` back to the root, tip first
    pub fn chain_from(&self, hash: &str) -> Vec<Block> {
        let Ok(blocks) = self.blocks.read() else {
            return Vec::new();
        };
        let mut chain = Vec::new();
        let mut cursor = hash;
        while let Some(entry) = blocks.get(cursor) {
            if chain.len() > blocks.len() {
                break;
            }
            chain.push(entry.block.clone());
            cursor = entry.block.get_prev_hash();
            if cursor.is_empty() {
                break;
            }
        }
        chain
    }
}
