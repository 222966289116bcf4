use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConsensusError {
    #[error("invalid stake {stake} for validator {validator}: must be finite and non-negative")]
    InvalidStake { validator: String, stake: f64 },

    #[error("stake {stake} for validator {validator} would overflow the total stake")]
    StakeOverflow { validator: String, stake: f64 },
}
