pub mod consensus;
pub mod engine;
pub mod error;
pub mod pos;
pub mod pow;
pub mod stake;

pub use consensus::{Consensus, MiningOutcome};
pub use engine::ConsensusEngine;
pub use error::ConsensusError;
pub use pos::ProofOfStake;
pub use pow::ProofOfWork;
pub use stake::{SlashingRecord, StakeTable};

/// Share of its stake a validator keeps each time it is slashed (a 20% cut).
pub const SLASHED_STAKE_RETAINED: f64 = 0.8;
