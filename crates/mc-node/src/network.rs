use std::collections::BTreeMap;

use mc_blockchain::Block;
use mc_transaction::Transaction;
use tracing::{debug, info, warn};

use crate::{
    error::NodeError,
    node::Node,
    protocol::{encode_message, NetworkMessage},
};

/// An in-process registry of [`Node`]s that routes encoded messages between
/// them by identifier.
///
/// Delivery is synchronous: a broadcast returns once every recipient has
/// handled the message.  A recipient that fails to handle a message is logged
/// and skipped; it does not abort the broadcast.
#[derive(Default)]
pub struct Network {
    nodes: BTreeMap<String, Node>,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node.  Returns `false` (and drops `node`) if a node with
    /// the same identifier is already registered.
    pub fn add_node(&mut self, node: Node) -> bool {
        if self.nodes.contains_key(node.id()) {
            warn!(node = %node.id(), "Node already exists in the network");
            return false;
        }
        info!(node = %node.id(), "Node added to the network");
        self.nodes.insert(node.id().to_string(), node);
        true
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Make `a` and `b` peers of each other.
    pub fn connect(&mut self, a: &str, b: &str) -> Result<(), NodeError> {
        for id in [a, b] {
            if !self.nodes.contains_key(id) {
                return Err(NodeError::UnknownNode(id.to_string()));
            }
        }
        if let Some(node) = self.nodes.get_mut(a) {
            node.add_peer(b);
        }
        if let Some(node) = self.nodes.get_mut(b) {
            node.add_peer(a);
        }
        Ok(())
    }

    /// Send `block` to every peer of `from`.  Returns how many peers accepted
    /// it.
    pub fn broadcast_block(&mut self, from: &str, block: &Block) -> Result<usize, NodeError> {
        let targets = self.peers_of(from)?;
        let bytes = encode(&NetworkMessage::Block(block.clone()))?;
        Ok(self.deliver(&targets, &bytes))
    }

    /// Send `tx` to every peer of `from`.  Returns how many peers accepted it.
    pub fn broadcast_transaction(
        &mut self,
        from: &str,
        tx: &Transaction,
    ) -> Result<usize, NodeError> {
        let targets = self.peers_of(from)?;
        let bytes = encode(&NetworkMessage::Transaction(tx.clone()))?;
        Ok(self.deliver(&targets, &bytes))
    }

    /// Send `block` once to every registered node.
    pub fn broadcast_block_to_network(&mut self, block: &Block) -> Result<usize, NodeError> {
        let targets: Vec<String> = self.nodes.keys().cloned().collect();
        let bytes = encode(&NetworkMessage::Block(block.clone()))?;
        Ok(self.deliver(&targets, &bytes))
    }

    /// Send `tx` once to every registered node.
    pub fn broadcast_transaction_to_network(
        &mut self,
        tx: &Transaction,
    ) -> Result<usize, NodeError> {
        let targets: Vec<String> = self.nodes.keys().cloned().collect();
        let bytes = encode(&NetworkMessage::Transaction(tx.clone()))?;
        Ok(self.deliver(&targets, &bytes))
    }

    /// Have `from` seal its pending transactions and broadcast the result to
    /// its peers.
    pub fn produce_and_broadcast(&mut self, from: &str) -> Result<Block, NodeError> {
        let block = self
            .nodes
            .get_mut(from)
            .ok_or_else(|| NodeError::UnknownNode(from.to_string()))?
            .produce_block()?;
        let delivered = self.broadcast_block(from, &block)?;
        debug!(node = %from, delivered, "Broadcast produced block");
        Ok(block)
    }

    fn peers_of(&self, id: &str) -> Result<Vec<String>, NodeError> {
        let node = self
            .nodes
            .get(id)
            .ok_or_else(|| NodeError::UnknownNode(id.to_string()))?;
        Ok(node.peers().map(str::to_string).collect())
    }

    fn deliver(&mut self, targets: &[String], bytes: &[u8]) -> usize {
        let mut delivered = 0;
        for id in targets {
            let Some(node) = self.nodes.get_mut(id) else {
                warn!(node = %id, "Dropping message for unknown node");
                continue;
            };
            match node.handle_message(bytes) {
                Ok(()) => delivered += 1,
                Err(e) => warn!(node = %id, "Message not accepted: {e}"),
            }
        }
        delivered
    }
}

fn encode(msg: &NetworkMessage) -> Result<Vec<u8>, NodeError> {
    encode_message(msg).map_err(|e| NodeError::Serialisation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use crate::NodeConfig;

    use super::*;

    fn add(network: &mut Network, id: &str) {
        let (node, _events) = Node::new(NodeConfig::pow(id, 0)).unwrap();
        assert!(network.add_node(node));
    }

    #[test]
    fn duplicate_node_ids_are_ignored() {
        let mut network = Network::new();
        add(&mut network, "a");
        let (dup, _events) = Node::new(NodeConfig::pow("a", 0)).unwrap();
        assert!(!network.add_node(dup));
        assert_eq!(network.len(), 1);
    }

    #[test]
    fn connect_is_symmetric() {
        let mut network = Network::new();
        add(&mut network, "a");
        add(&mut network, "b");
        network.connect("a", "b").unwrap();

        assert_eq!(network.node("a").unwrap().peers().collect::<Vec<_>>(), ["b"]);
        assert_eq!(network.node("b").unwrap().peers().collect::<Vec<_>>(), ["a"]);
    }

    #[test]
    fn connect_unknown_node_fails() {
        let mut network = Network::new();
        add(&mut network, "a");
        assert!(matches!(
            network.connect("a", "ghost"),
            Err(NodeError::UnknownNode(id)) if id == "ghost"
        ));
        assert_eq!(network.node("a").unwrap().peers().count(), 0);
    }

    #[test]
    fn transaction_reaches_only_peers() {
        let mut network = Network::new();
        for id in ["a", "b", "c"] {
            add(&mut network, id);
        }
        network.connect("a", "b").unwrap();

        let tx = Transaction::new("Alice", "Bob", 7.0).unwrap();
        assert_eq!(network.broadcast_transaction("a", &tx).unwrap(), 1);

        assert_eq!(network.node("b").unwrap().pending_transactions(), [tx]);
        assert!(network.node("c").unwrap().pending_transactions().is_empty());
    }

    #[test]
    fn network_wide_transaction_reaches_everyone_once() {
        let mut network = Network::new();
        for id in ["a", "b", "c"] {
            add(&mut network, id);
        }
        network.connect("a", "b").unwrap();
        network.connect("b", "c").unwrap();

        let tx = Transaction::new("Alice", "Bob", 1.0).unwrap();
        assert_eq!(network.broadcast_transaction_to_network(&tx).unwrap(), 3);
        for id in ["a", "b", "c"] {
            assert_eq!(network.node(id).unwrap().pending_transactions().len(), 1);
        }
    }

    #[test]
    fn broadcast_from_unknown_node_fails() {
        let mut network = Network::new();
        let tx = Transaction::new("Alice", "Bob", 1.0).unwrap();
        assert!(matches!(
            network.broadcast_transaction("ghost", &tx),
            Err(NodeError::UnknownNode(_))
        ));
    }
}
