use mc_blockchain::Block;

use crate::{Consensus, MiningOutcome, ProofOfStake, ProofOfWork};

/// One of the supported consensus mechanisms, chosen at runtime.
#[derive(Debug, Clone)]
pub enum ConsensusEngine {
    ProofOfWork(ProofOfWork),
    ProofOfStake(ProofOfStake),
}

impl Default for ConsensusEngine {
    fn default() -> Self {
        Self::ProofOfWork(ProofOfWork)
    }
}

impl ConsensusEngine {
    /// Short human-readable name, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ProofOfWork(_) => "proof-of-work",
            Self::ProofOfStake(_) => "proof-of-stake",
        }
    }

    /// The proof-of-stake state, if this is the proof-of-stake engine.
    pub fn proof_of_stake(&self) -> Option<&ProofOfStake> {
        match self {
            Self::ProofOfStake(pos) => Some(pos),
            Self::ProofOfWork(_) => None,
        }
    }
}

impl From<ProofOfWork> for ConsensusEngine {
    fn from(pow: ProofOfWork) -> Self {
        Self::ProofOfWork(pow)
    }
}

impl From<ProofOfStake> for ConsensusEngine {
    fn from(pos: ProofOfStake) -> Self {
        Self::ProofOfStake(pos)
    }
}

impl Consensus for ConsensusEngine {
    fn mine(&mut self, block: &mut Block, difficulty: usize) -> MiningOutcome {
        match self {
            Self::ProofOfWork(pow) => pow.mine(block, difficulty),
            Self::ProofOfStake(pos) => pos.mine(block, difficulty),
        }
    }

    fn validate_block(&mut self, block: &Block, difficulty: usize) -> bool {
        match self {
            Self::ProofOfWork(pow) => pow.validate_block(block, difficulty),
            Self::ProofOfStake(pos) => pos.validate_block(block, difficulty),
        }
    }
}
