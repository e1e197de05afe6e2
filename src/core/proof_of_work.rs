use crate::core::Block;
use crate::utils::{base64_decode, base64_encode, sha256_digest};
use log::debug;

/// Leading zero bytes a block hash must carry on the network
pub const DEFAULT_DIFFICULTY: usize = 3;

/// Upper bound on difficulty: a SHA-256 digest has 32 bytes
pub const MAX_DIFFICULTY: usize = 32;

/// Hash-puzzle search and verification for a fixed number of zero bytes
#[derive(Debug, Clone, Copy)]
pub struct ProofOfWork {
    difficulty: usize,
}

impl Default for ProofOfWork {
    fn default() -> Self {
        Self::new(DEFAULT_DIFFICULTY)
    }
}

impl ProofOfWork {
    pub fn new(difficulty: usize) -> ProofOfWork {
        ProofOfWork {
            difficulty: difficulty.min(MAX_DIFFICULTY),
        }
    }

    pub fn get_difficulty(&self) -> usize {
        self.difficulty
    }

    /// True when the first `difficulty` bytes of `hash` are all zero
    pub fn meets_target(&self, hash: &[u8]) -> bool {
        hash.len() >= self.difficulty && hash[..self.difficulty].iter().all(|b| *b == 0)
    }

    /// Validate the stored hash of a block: it must decode, meet the target and
    /// equal the hash recomputed from the block's current fields.
    pub fn validate(&self, block: &Block) -> bool {
        let Ok(stored) = base64_decode(block.get_hash()) else {
            return false;
        };
        if stored.len() != 32 || !self.meets_target(&stored) {
            return false;
        }
        stored == block.calc_hash_bytes()
    }

    /// Search nonces upward from the block's current nonce (wrapping) until the
    /// hash meets the target. `abort` is consulted before every attempt.
    ///
    /// Returns `true` with the block's nonce and hash set on success. Returns
    /// `false` if aborted or if the whole 32-bit nonce space was tried.
    pub fn run<F>(&self, block: &mut Block, abort: F) -> bool
    where
        F: Fn() -> bool,
    {
        let prefix = block.encoding_prefix();
        let start = block.get_nonce();
        let mut nonce = start;
        loop {
            if abort() {
                debug!("Proof-of-work aborted at nonce {nonce}");
                return false;
            }
            let hash = sha256_digest(format!("{prefix}{nonce}").as_bytes());
            if self.meets_target(&hash) {
                block.set_nonce(nonce);
                block.set_hash(base64_encode(&hash));
                return true;
            }
            nonce = nonce.wrapping_add(1);
            if nonce == start {
                return false;
            }
        }
    }
}
