use mc_blockchain::Block;
use mc_hash::meets_difficulty;
use tracing::{debug, warn};

use crate::{Consensus, MiningOutcome};

/// Proof-of-work: a block is final once its hash starts with `difficulty`
/// zero characters.  Stateless and deterministic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProofOfWork;

impl Consensus for ProofOfWork {
    fn mine(&mut self, block: &mut Block, difficulty: usize) -> MiningOutcome {
        debug!(difficulty, "Mining block with proof of work");
        block.mine(difficulty);
        MiningOutcome::Sealed { validator: None }
    }

    fn validate_block(&mut self, block: &Block, difficulty: usize) -> bool {
        let valid = meets_difficulty(block.hash(), difficulty);
        if !valid {
            warn!(
                difficulty,
                hash = %block.hash(),
                "Block hash does not meet the required difficulty"
            );
        }
        valid
    }
}
