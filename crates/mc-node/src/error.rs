use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("serialisation error: {0}")]
    Serialisation(String),

    #[error("blockchain error: {0}")]
    Blockchain(#[from] mc_blockchain::BlockchainError),

    #[error("consensus error: {0}")]
    Consensus(#[from] mc_consensus::ConsensusError),

    #[error("unknown node {0}")]
    UnknownNode(String),

    #[error("no pending transactions to form a block")]
    NoPendingTransactions,

    #[error("no validator was selected to produce the block")]
    NoValidatorSelected,

    #[error("block {0} rejected: local chain is invalid")]
    RejectedBlock(String),
}
