//! Proof-of-work block and chain
//!
//! Blocks batch transaction records and link to the previous block's
//! digest. A block is sealed by grinding its nonce until the hex SHA-256
//! digest of its canonical serialization carries the required number of
//! leading zero characters.
//!
//! This is a local integrity log, not a consensus mechanism: the chain is
//! never forked, reorganized, or reconciled against a peer.

use crate::types::TxRecord;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Previous-hash sentinel carried by the genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// A batch of transaction records, immutable once appended to the chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Block creation timestamp
    pub timestamp: DateTime<Utc>,
    /// Ordered transaction records sealed into this block
    pub transactions: Vec<TxRecord>,
    /// Digest of the previous block
    pub previous_hash: String,
    /// Proof-of-work nonce
    pub nonce: u64,
    /// Hex SHA-256 digest over (timestamp, transactions, previous_hash, nonce)
    pub hash: String,
}

/// Canonical hashing input; field order is fixed so the digest is
/// reproducible across implementations.
#[derive(Serialize)]
struct DigestInput<'a> {
    timestamp: &'a DateTime<Utc>,
    transactions: &'a [TxRecord],
    previous_hash: &'a str,
    nonce: u64,
}

impl Block {
    /// Create an unsealed block extending `previous_hash`
    pub fn new(
        timestamp: DateTime<Utc>,
        transactions: Vec<TxRecord>,
        previous_hash: String,
    ) -> Self {
        let mut block = Self {
            timestamp,
            transactions,
            previous_hash,
            nonce: 0,
            hash: String::new(),
        };
        block.hash = block.compute_digest();
        block
    }

    /// Recompute this block's digest from its contents
    pub fn compute_digest(&self) -> String {
        let input = DigestInput {
            timestamp: &self.timestamp,
            transactions: &self.transactions,
            previous_hash: &self.previous_hash,
            nonce: self.nonce,
        };
        let canonical =
            serde_json::to_vec(&input).expect("canonical block serialization cannot fail");

        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        hex::encode(hasher.finalize())
    }

    /// Grind the nonce until the digest carries `difficulty` leading zeros
    ///
    /// Deliberately unbounded work proportional to `16^difficulty` expected
    /// iterations; synchronous and CPU-bound by design.
    pub fn seal(&mut self, difficulty: usize) {
        let target = "0".repeat(difficulty);
        while !self.hash.starts_with(&target) {
            self.nonce += 1;
            self.hash = self.compute_digest();
        }
    }

    /// Check whether the digest satisfies the difficulty target
    pub fn is_sealed(&self, difficulty: usize) -> bool {
        self.hash.starts_with(&"0".repeat(difficulty)) && self.hash == self.compute_digest()
    }
}

/// Append-only chain of sealed blocks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chain {
    blocks: Vec<Block>,
}

impl Chain {
    /// Create a chain holding only the genesis block
    pub fn new(genesis_at: DateTime<Utc>) -> Self {
        let genesis = Block::new(genesis_at, Vec::new(), GENESIS_PREVIOUS_HASH.to_string());
        Self {
            blocks: vec![genesis],
        }
    }

    /// The most recently appended block
    pub fn tip(&self) -> &Block {
        self.blocks.last().expect("chain always holds genesis")
    }

    /// Append a sealed block extending the current tip
    pub fn append(&mut self, block: Block) -> Result<()> {
        let tip_hash = &self.tip().hash;
        if block.previous_hash != *tip_hash {
            return Err(Error::BlockLinkMismatch {
                expected: tip_hash.clone(),
                actual: block.previous_hash,
            });
        }

        let recomputed = block.compute_digest();
        if block.hash != recomputed {
            return Err(Error::BlockDigestMismatch {
                expected: recomputed,
                actual: block.hash,
            });
        }

        self.blocks.push(block);
        Ok(())
    }

    /// All blocks, genesis first
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Number of blocks including genesis
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// A chain always holds at least the genesis block
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Walk the chain verifying every digest and link
    pub fn is_valid(&self) -> bool {
        for (i, block) in self.blocks.iter().enumerate() {
            if block.hash != block.compute_digest() {
                return false;
            }
            let expected_previous = if i == 0 {
                GENESIS_PREVIOUS_HASH
            } else {
                &self.blocks[i - 1].hash
            };
            if block.previous_hash != expected_previous {
                return false;
            }
        }
        true
    }
}
