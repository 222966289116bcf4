use mc_blockchain::DEFAULT_DIFFICULTY;
use mc_consensus::{ConsensusEngine, ProofOfStake, ProofOfWork, SlashingRecord, StakeTable};

use crate::error::NodeError;

/// Which consensus mechanism a node runs.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ConsensusKind {
    /// Mine blocks by hash puzzle at the chain difficulty (default).
    #[default]
    ProofOfWork,

    /// Forge blocks by stake-weighted validator selection.
    ProofOfStake { stakes: Vec<(String, f64)> },
}

impl ConsensusKind {
    /// A two-validator stake table with a 2:1 split.
    pub fn default_stakes() -> Vec<(String, f64)> {
        vec![
            ("validator-1".to_string(), 100.0),
            ("validator-2".to_string(), 50.0),
        ]
    }
}

/// Full configuration for a [`crate::Node`].
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Identifier other nodes use to address this one.  Defaults to `node-1`.
    pub node_id: String,

    /// Proof-of-work difficulty of the node's chain.  Ignored when the node
    /// is built from an existing chain.
    pub difficulty: usize,

    /// Consensus mechanism used when producing and validating blocks.
    pub consensus: ConsensusKind,

    /// When `true` the binary embedding this node should suppress log output.
    /// The library itself does not initialise a tracing subscriber; this flag
    /// is a signal to the host binary.
    pub quiet: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: "node-1".to_string(),
            difficulty: DEFAULT_DIFFICULTY,
            consensus: ConsensusKind::default(),
            quiet: false,
        }
    }
}

impl NodeConfig {
    /// A proof-of-work node.
    pub fn pow(node_id: impl Into<String>, difficulty: usize) -> Self {
        Self {
            node_id: node_id.into(),
            difficulty,
            ..Self::default()
        }
    }

    /// A proof-of-stake node with the given stake table.
    pub fn pos(node_id: impl Into<String>, difficulty: usize, stakes: Vec<(String, f64)>) -> Self {
        Self {
            node_id: node_id.into(),
            difficulty,
            consensus: ConsensusKind::ProofOfStake { stakes },
            ..Self::default()
        }
    }

    /// Build the consensus engine this config describes.
    pub fn build_consensus(&self) -> Result<ConsensusEngine, NodeError> {
        let engine = match &self.consensus {
            ConsensusKind::ProofOfWork => ConsensusEngine::from(ProofOfWork),
            ConsensusKind::ProofOfStake { stakes } => {
                let table = StakeTable::new(stakes.iter().cloned())?;
                ConsensusEngine::from(ProofOfStake::new(table, SlashingRecord::new()))
            }
        };
        Ok(engine)
    }
}
