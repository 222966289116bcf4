use std::fmt;

use chrono::Utc;
use mc_hash::{meets_difficulty, sha256_hex};
use mc_transaction::Transaction;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{GENESIS_PREVIOUS_HASH, IMPRACTICAL_DIFFICULTY};

/// The part of a block that mining is allowed to change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Seal {
    nonce: u64,
    hash: String,
}

/// A single block in the chain.
///
/// `previous_hash`, `timestamp` and `transactions` are fixed when the block
/// is built.  The seal (nonce and cached hash) is only rewritten by
/// [`Block::mine`], so outside of mining the stored hash always equals
/// [`Block::compute_hash`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Hex hash of the previous block, or `"0"` for genesis.
    previous_hash: String,

    /// Unix timestamp (milliseconds) when this block was created.
    timestamp: i64,

    /// Transactions bundled in this block, in order.
    pub(crate) transactions: Vec<Transaction>,

    seal: Seal,
}

impl Block {
    /// Build an unmined block on top of `previous_hash`.
    ///
    /// The nonce starts at zero and the hash is computed immediately.
    pub fn new(transactions: Vec<Transaction>, previous_hash: impl Into<String>) -> Self {
        let mut block = Self {
            previous_hash: previous_hash.into(),
            timestamp: Utc::now().timestamp_millis(),
            transactions,
            seal: Seal {
                nonce: 0,
                hash: String::new(),
            },
        };
        block.seal.hash = block.compute_hash();
        block
    }

    /// An empty, unmined genesis block.
    pub fn genesis() -> Self {
        Self::new(Vec::new(), GENESIS_PREVIOUS_HASH)
    }

    /// SHA-256 over `previous_hash ‖ timestamp ‖ nonce ‖ transactions`.
    ///
    /// Transactions are serialised as an ordered JSON array, so changing any
    /// field of any transaction changes the hash.
    pub fn compute_hash(&self) -> String {
        let txs_json = serde_json::to_string(&self.transactions)
            .expect("transactions always serialise to JSON");
        let preimage = format!(
            "{}{}{}{}",
            self.previous_hash, self.timestamp, self.seal.nonce, txs_json
        );
        sha256_hex(preimage)
    }

    /// Proof-of-work: bump the nonce until the hash starts with `difficulty`
    /// zero characters.
    ///
    /// This blocks until a matching hash is found and has no upper bound.  A
    /// difficulty of zero returns immediately; a difficulty above the digest
    /// length never finishes.
    pub fn mine(&mut self, difficulty: usize) {
        if difficulty >= IMPRACTICAL_DIFFICULTY {
            warn!(
                    difficulty,
                "Difficulty may be unsolvable in reasonable time"
            );
        }

        while !meets_difficulty(&self.seal.hash, difficulty) {
            self.seal.nonce = self.seal.nonce.wrapping_add(1);
            self.seal.hash = self.compute_hash();
        }

        debug!(
            difficulty,
            nonce = self.seal.nonce,
            hash = %self.seal.hash,
            "Block mined"
        );
    }

    /// `true` when the stored hash is current and satisfies `difficulty`.
    pub fn is_sealed(&self, difficulty: usize) -> bool {
        self.seal.hash == self.compute_hash() && meets_difficulty(&self.seal.hash, difficulty)
    }

    pub fn hash(&self) -> &str {
        &self.seal.hash
    }

    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn nonce(&self) -> u64 {
        self.seal.nonce
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn is_genesis(&self) -> bool {
        self.previous_hash == GENESIS_PREVIOUS_HASH
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Block {{ hash: {}, previous: {}, txs: {}, timestamp: {}, nonce: {} }}",
            self.seal.hash,
            self.previous_hash,
            self.transactions.len(),
            self.timestamp,
            self.seal.nonce
        )
    }
}
