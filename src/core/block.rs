use crate::core::{ProofOfWork, Transaction, DEFAULT_DIFFICULTY};
use crate::utils::{base64_encode, sha256_digest};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A block of transactions chained to its parent by `prev_hash`.
///
/// An empty `prev_hash` marks a root block. `hash` is only meaningful once the
/// block has been mined; it is stored as base64 text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    prev_hash: String,
    creator: String,
    #[serde(default)]
    transactions: Vec<Transaction>,
    #[serde(rename = "prove_of_work")]
    nonce: u32,
    #[serde(default)]
    hash: String,
}

impl Block {
    pub fn new(
        prev_hash: String,
        creator: &str,
        transactions: Vec<Transaction>,
        nonce: u32,
    ) -> Block {
        Block {
            prev_hash,
            creator: creator.to_string(),
            transactions,
            nonce,
            hash: String::new(),
        }
    }

    pub fn get_prev_hash(&self) -> &str {
        self.prev_hash.as_str()
    }

    pub fn is_root(&self) -> bool {
        self.prev_hash.is_empty()
    }

    pub fn get_creator(&self) -> &str {
        self.creator.as_str()
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn into_transactions(self) -> Vec<Transaction> {
        self.transactions
    }

    pub fn get_nonce(&self) -> u32 {
        self.nonce
    }

    pub fn set_nonce(&mut self, nonce: u32) {
        self.nonce = nonce;
    }

    pub fn get_hash(&self) -> &str {
        self.hash.as_str()
    }

    pub fn set_hash(&mut self, hash: String) {
        self.hash = hash;
    }

    /// Everything in the canonical encoding that precedes the nonce:
    /// `prev_hash,creator,[(tx1),(tx2)],`
    pub fn encoding_prefix(&self) -> String {
        let txs: Vec<String> = self
            .transactions
            .iter()
            .map(|tx| format!("({})", tx.canonical_encoding()))
            .collect();
        format!("{},{},[{}],", self.prev_hash, self.creator, txs.join(","))
    }

    /// `prev_hash,creator,[(tx1),(tx2),...],nonce`
    pub fn canonical_encoding(&self) -> String {
        format!("{}{}", self.encoding_prefix(), self.nonce)
    }

    /// Raw SHA-256 of the canonical encoding for the current field values
    pub fn calc_hash_bytes(&self) -> Vec<u8> {
        sha256_digest(self.canonical_encoding().as_bytes())
    }

    /// Base64 text of [`Block::calc_hash_bytes`]
    pub fn calc_hash(&self) -> String {
        base64_encode(&self.calc_hash_bytes())
    }

    /// Proof-of-work check at the network difficulty (three zero bytes)
    pub fn verify(&self) -> bool {
        self.verify_with_difficulty(DEFAULT_DIFFICULTY)
    }

    /// The stored hash must carry `difficulty` leading zero bytes and equal a
    /// freshly computed hash. Both checks are required.
    pub fn verify_with_difficulty(&self, difficulty: usize) -> bool {
        ProofOfWork::new(difficulty).validate(self)
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "block {} by {} ({} txs, nonce {})",
            if self.hash.is_empty() { "<unmined>" } else { &self.hash },
            self.creator,
            self.transactions.len(),
            self.nonce
        )
    }
}
