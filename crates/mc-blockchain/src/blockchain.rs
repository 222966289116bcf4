use std::fmt;

use tracing::{info, warn};

use crate::{block::Block, error::BlockchainError, DEFAULT_DIFFICULTY};

/// The append-only chain of [`Block`]s.
///
/// Invariants maintained by this type:
/// - Always contains at least the genesis block.
/// - Every block is mined under the chain's difficulty before it is stored.
/// - Stored blocks cannot be modified through the chain.
///
/// Linkage between neighbours is *not* enforced by [`Blockchain::append`];
/// it is checked after the fact by [`Blockchain::is_valid`], or up front by
/// [`Blockchain::append_checked`].
#[derive(Debug, Clone)]
pub struct Blockchain {
    blocks: Vec<Block>,
    difficulty: usize,
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new(DEFAULT_DIFFICULTY)
    }
}

impl Blockchain {
    /// Initialise a new chain with a mined genesis block.
    pub fn new(difficulty: usize) -> Self {
        let mut genesis = Block::genesis();
        genesis.mine(difficulty);
        info!(difficulty, hash = %genesis.hash(), "Genesis block mined");

        Self {
            blocks: vec![genesis],
            difficulty,
        }
    }

    /// The proof-of-work difficulty every appended block is mined under.
    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    /// Number of blocks in the chain (including genesis).
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The most recent block.
    pub fn tip(&self) -> &Block {
        self.blocks
            .last()
            .expect("chain always holds the genesis block")
    }

    /// Mine `block` under the chain's difficulty and append it.
    ///
    /// The block's `previous_hash` is not compared with the tip; a block that
    /// links elsewhere is still stored and makes [`Blockchain::is_valid`]
    /// return `false`.
    pub fn append(&mut self, mut block: Block) -> &Block {
        block.mine(self.difficulty);
        info!(
            height = self.blocks.len(),
            hash = %block.hash(),
            txs = block.transactions().len(),
            "Appended block"
        );
        self.blocks.push(block);
        self.tip()
    }

    /// Like [`Blockchain::append`], but refuses a block whose `previous_hash`
    /// is not the current tip's hash.  Nothing is mined on rejection.
    pub fn append_checked(&mut self, block: Block) -> Result<&Block, BlockchainError> {
        let expected = self.tip().hash();
        if block.previous_hash() != expected {
            return Err(BlockchainError::LinkageMismatch {
                expected: expected.to_string(),
                found: block.previous_hash().to_string(),
            });
        }
        Ok(self.append(block))
    }

    /// Return a reference to a block by its height.
    pub fn get_block(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    /// All blocks in the chain.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Replay every hash check over the chain:
    /// - each block's stored hash matches a fresh recomputation;
    /// - each block's `previous_hash` matches its predecessor's stored hash.
    ///
    /// Stops at the first failure.  The genesis block's own content is not
    /// rechecked.
    pub fn is_valid(&self) -> bool {
        for (offset, window) in self.blocks.windows(2).enumerate() {
            let height = offset + 1;
            let prev = &window[0];
            let current = &window[1];

            if current.hash() != current.compute_hash() {
                warn!(height, "Block hash does not match its contents");
                return false;
            }
            if current.previous_hash() != prev.hash() {
                warn!(height, "Block does not link to its predecessor");
                return false;
            }
        }

        true
    }

    #[cfg(test)]
    pub(crate) fn blocks_mut(&mut self) -> &mut [Block] {
        &mut self.blocks
    }
}

impl fmt::Display for Blockchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (height, block) in self.blocks.iter().enumerate() {
            writeln!(f, "#{height} {block}")?;
        }
        Ok(())
    }
}
