use mc_transaction::Transaction;

/// Events emitted by a [`crate::Node`] that callers (e.g. the demo binary)
/// can drain from a channel.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeEvent {
    /// A peer was added to this node's peer set.
    PeerConnected(String),

    /// A transaction was submitted to or received by this node.
    TransactionReceived(Transaction),

    /// A block from elsewhere was mined into the local chain.
    BlockAppended { height: usize, hash: String },

    /// A block from elsewhere was refused because the local chain is invalid.
    BlockRejected { hash: String },

    /// This node sealed its pending transactions into a new block.
    BlockProduced {
        height: usize,
        hash: String,
        validator: Option<String>,
    },

    /// The consensus engine checked the chain tip.
    TipValidated { hash: String, valid: bool },
}
