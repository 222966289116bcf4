use std::collections::BTreeSet;

use mc_blockchain::{Block, Blockchain};
use mc_consensus::{Consensus, ConsensusEngine, MiningOutcome};
use mc_transaction::Transaction;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    config::NodeConfig,
    error::NodeError,
    event::NodeEvent,
    protocol::{decode_message, NetworkMessage},
};

/// A participant on the [`crate::Network`].
///
/// A node owns its chain, its consensus engine and a pool of pending
/// transactions.  Peers are referred to by identifier only; all traffic
/// between nodes goes through the network as encoded [`NetworkMessage`]s.
pub struct Node {
    id: String,
    blockchain: Blockchain,
    consensus: ConsensusEngine,
    peers: BTreeSet<String>,
    pending_transactions: Vec<Transaction>,
    event_tx: mpsc::UnboundedSender<NodeEvent>,
}

impl Node {
    /// Create a node with a fresh chain mined at `config.difficulty`.
    ///
    /// Returns the node together with a receiver for [`NodeEvent`]s that the
    /// calling application can process independently.
    pub fn new(
        config: NodeConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<NodeEvent>), NodeError> {
        let blockchain = Blockchain::new(config.difficulty);
        Self::with_blockchain(config, blockchain)
    }

    /// Create a node that starts from an existing chain, e.g. a clone of a
    /// shared genesis so that every node links to the same first block.
    pub fn with_blockchain(
        config: NodeConfig,
        blockchain: Blockchain,
    ) -> Result<(Self, mpsc::UnboundedReceiver<NodeEvent>), NodeError> {
        let consensus = config.build_consensus()?;
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        info!(
            node = %config.node_id,
            consensus = consensus.name(),
            difficulty = blockchain.difficulty(),
            "Node created"
        );

        let node = Self {
            id: config.node_id,
            blockchain,
            consensus,
            peers: BTreeSet::new(),
            pending_transactions: Vec::new(),
            event_tx,
        };

        Ok((node, event_rx))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Provide read access to the local blockchain.
    pub fn blockchain(&self) -> &Blockchain {
        &self.blockchain
    }

    pub fn consensus(&self) -> &ConsensusEngine {
        &self.consensus
    }

    pub fn peers(&self) -> impl Iterator<Item = &str> {
        self.peers.iter().map(String::as_str)
    }

    pub fn pending_transactions(&self) -> &[Transaction] {
        &self.pending_transactions
    }

    /// Add `peer` to the peer set.  Returns `false` if it was already known
    /// or is this node itself.
    pub fn add_peer(&mut self, peer: impl Into<String>) -> bool {
        let peer = peer.into();
        if peer == self.id || !self.peers.insert(peer.clone()) {
            return false;
        }
        info!(node = %self.id, %peer, "Connected to peer");
        let _ = self.event_tx.send(NodeEvent::PeerConnected(peer));
        true
    }

    /// Put a transaction in the pending pool.
    pub fn submit_transaction(&mut self, tx: Transaction) {
        debug!(node = %self.id, %tx, "Received transaction");
        let _ = self
            .event_tx
            .send(NodeEvent::TransactionReceived(tx.clone()));
        self.pending_transactions.push(tx);
    }

    /// Accept a block from elsewhere.
    ///
    /// The block is mined under the local difficulty and appended as long as
    /// the local chain is currently valid.  Its linkage to the local tip is
    /// not checked here; a block that links elsewhere shows up on the next
    /// validity check and blocks further acceptance.
    pub fn submit_block(&mut self, block: Block) -> Result<(), NodeError> {
        if !self.blockchain.is_valid() {
            warn!(node = %self.id, hash = %block.hash(), "Rejected block: local chain is invalid");
            let hash = block.hash().to_string();
            let _ = self
                .event_tx
                .send(NodeEvent::BlockRejected { hash: hash.clone() });
            return Err(NodeError::RejectedBlock(hash));
        }

        let hash = self.blockchain.append(block).hash().to_string();
        let height = self.blockchain.len() - 1;
        info!(node = %self.id, height, %hash, "Added block from peer");
        let _ = self.event_tx.send(NodeEvent::BlockAppended { height, hash });
        Ok(())
    }

    /// Decode a message from the network and dispatch it.
    pub fn handle_message(&mut self, bytes: &[u8]) -> Result<(), NodeError> {
        match decode_message(bytes).map_err(|e| NodeError::Serialisation(e.to_string()))? {
            NetworkMessage::Transaction(tx) => {
                self.submit_transaction(tx);
                Ok(())
            }
            NetworkMessage::Block(block) => self.submit_block(block),
        }
    }

    /// Seal the pending transactions into a block on top of the local tip
    /// using this node's consensus engine, and append it.
    ///
    /// Returns a copy of the appended block for broadcasting.  The pending
    /// pool is only cleared once the block is on the chain; when
    /// proof-of-stake selects nobody or the append fails it is left intact.
    pub fn produce_block(&mut self) -> Result<Block, NodeError> {
        if self.pending_transactions.is_empty() {
            return Err(NodeError::NoPendingTransactions);
        }

        let mut block = Block::new(
            self.pending_transactions.clone(),
            self.blockchain.tip().hash(),
        );
        let difficulty = self.blockchain.difficulty();

        let validator = match self.consensus.mine(&mut block, difficulty) {
            MiningOutcome::Sealed { validator } => validator,
            MiningOutcome::NoValidator => {
                warn!(node = %self.id, "No validator selected, keeping pending transactions");
                return Err(NodeError::NoValidatorSelected);
            }
        };

        self.commit_produced(block, validator)
    }

    /// Append a locally sealed block and drop the transactions it carries
    /// from the pending pool.  On a linkage failure the pool is untouched.
    fn commit_produced(
        &mut self,
        block: Block,
        validator: Option<String>,
    ) -> Result<Block, NodeError> {
        let block = self.blockchain.append_checked(block)?.clone();
        self.pending_transactions.clear();
        let height = self.blockchain.len() - 1;

        info!(node = %self.id, height, hash = %block.hash(), ?validator, "Produced block");
        let _ = self.event_tx.send(NodeEvent::BlockProduced {
            height,
            hash: block.hash().to_string(),
            validator,
        });

        Ok(block)
    }

    /// Run the consensus engine's block validation on the chain tip.
    ///
    /// Proof-of-stake validation is randomised and may slash a validator.
    pub fn validate_tip(&mut self) -> bool {
        let difficulty = self.blockchain.difficulty();
        let tip = self.blockchain.tip();
        let valid = self.consensus.validate_block(tip, difficulty);
        let hash = tip.hash().to_string();

        debug!(node = %self.id, %hash, valid, "Validated chain tip");
        let _ = self.event_tx.send(NodeEvent::TipValidated { hash, valid });
        valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConsensusKind;

    fn tx(amount: f64) -> Transaction {
        Transaction::new("Alice", "Bob", amount).unwrap()
    }

    #[test]
    fn produce_block_requires_pending_transactions() {
        let (mut node, _events) = Node::new(NodeConfig::pow("n1", 1)).unwrap();
        assert!(matches!(
            node.produce_block(),
            Err(NodeError::NoPendingTransactions)
        ));
    }

    #[test]
    fn produce_block_seals_pending_pool() {
        let (mut node, mut events) = Node::new(NodeConfig::pow("n1", 2)).unwrap();
        node.submit_transaction(tx(100.0));
        node.submit_transaction(tx(5.0));

        let block = node.produce_block().unwrap();
        assert!(block.hash().starts_with("00"));
        assert_eq!(block.transactions().len(), 2);
        assert!(node.pending_transactions().is_empty());
        assert_eq!(node.blockchain().len(), 2);
        assert!(node.blockchain().is_valid());

        assert!(matches!(
            events.try_recv(),
            Ok(NodeEvent::TransactionReceived(_))
        ));
        assert!(matches!(
            events.try_recv(),
            Ok(NodeEvent::TransactionReceived(_))
        ));
        assert!(matches!(
            events.try_recv(),
            Ok(NodeEvent::BlockProduced { height: 1, validator: None, .. })
        ));
    }

    #[test]
    fn failed_append_keeps_pending_pool() {
        let (mut node, _events) = Node::new(NodeConfig::pow("n1", 0)).unwrap();
        node.submit_transaction(tx(4.0));

        let stray = Block::new(node.pending_transactions().to_vec(), "elsewhere");
        let err = node.commit_produced(stray, None).unwrap_err();
        assert!(matches!(
            err,
            NodeError::Blockchain(mc_blockchain::BlockchainError::LinkageMismatch { .. })
        ));
        assert_eq!(node.pending_transactions(), [tx(4.0)]);
        assert_eq!(node.blockchain().len(), 1);
    }

    #[test]
    fn pos_without_stake_keeps_pending_pool() {
        let config = NodeConfig {
            consensus: ConsensusKind::ProofOfStake { stakes: Vec::new() },
            ..NodeConfig::pow("n1", 0)
        };
        let (mut node, _events) = Node::new(config).unwrap();
        node.submit_transaction(tx(1.0));

        assert!(matches!(
            node.produce_block(),
            Err(NodeError::NoValidatorSelected)
        ));
        assert_eq!(node.pending_transactions().len(), 1);
        assert_eq!(node.blockchain().len(), 1);
    }

    #[test]
    fn pos_node_credits_a_staked_validator() {
        let config = NodeConfig::pos("n1", 0, ConsensusKind::default_stakes());
        let (mut node, mut events) = Node::new(config).unwrap();
        node.submit_transaction(tx(1.0));
        node.produce_block().unwrap();

        let _ = events.try_recv();
        let Ok(NodeEvent::BlockProduced { validator: Some(v), .. }) = events.try_recv() else {
            panic!("expected a produced block with a validator");
        };
        let pos = node.consensus().proof_of_stake().unwrap();
        assert!(pos.stakes().contains(&v));
        assert_eq!(pos.last_validator(), Some(v.as_str()));
    }

    #[test]
    fn add_peer_is_idempotent_and_skips_self() {
        let (mut node, _events) = Node::new(NodeConfig::pow("n1", 0)).unwrap();
        assert!(node.add_peer("n2"));
        assert!(!node.add_peer("n2"));
        assert!(!node.add_peer("n1"));
        assert_eq!(node.peers().collect::<Vec<_>>(), ["n2"]);
    }

    #[test]
    fn block_is_rejected_once_local_chain_is_broken() {
        let (mut node, mut events) = Node::new(NodeConfig::pow("n1", 1)).unwrap();

        node.submit_block(Block::new(vec![tx(1.0)], "elsewhere")).unwrap();
        assert!(!node.blockchain().is_valid());

        let linked = Block::new(vec![tx(2.0)], node.blockchain().tip().hash());
        let err = node.submit_block(linked).unwrap_err();
        assert!(matches!(err, NodeError::RejectedBlock(_)));
        assert_eq!(node.blockchain().len(), 2);

        assert!(matches!(events.try_recv(), Ok(NodeEvent::BlockAppended { height: 1, .. })));
        assert!(matches!(events.try_recv(), Ok(NodeEvent::BlockRejected { .. })));
    }

    #[test]
    fn pow_tip_validates_at_chain_difficulty() {
        let (mut node, _events) = Node::new(NodeConfig::pow("n1", 2)).unwrap();
        node.submit_transaction(tx(3.0));
        node.produce_block().unwrap();
        assert!(node.validate_tip());
    }
}
