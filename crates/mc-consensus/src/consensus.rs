use mc_blockchain::Block;

/// Result of asking a consensus mechanism to finalise a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiningOutcome {
    /// The block's seal was written.  Proof-of-stake also reports the
    /// validator that nominally produced it.
    Sealed { validator: Option<String> },

    /// Proof-of-stake found nobody to produce the block; it was left as is.
    NoValidator,
}

impl MiningOutcome {
    pub fn is_sealed(&self) -> bool {
        matches!(self, MiningOutcome::Sealed { .. })
    }

    pub fn validator(&self) -> Option<&str> {
        match self {
            MiningOutcome::Sealed { validator } => validator.as_deref(),
            MiningOutcome::NoValidator => None,
        }
    }
}

/// The contract shared by every consensus mechanism.
///
/// `difficulty` is the policy hint passed through from the chain; mechanisms
/// that have no use for it ignore it.  Both operations may update internal
/// state, which is why they take `&mut self`.
pub trait Consensus {
    /// Finalise `block` under this mechanism's rule.
    fn mine(&mut self, block: &mut Block, difficulty: usize) -> MiningOutcome;

    /// Check an already-finalised block.  Never fails; `false` means reject.
    fn validate_block(&mut self, block: &Block, difficulty: usize) -> bool;
}
