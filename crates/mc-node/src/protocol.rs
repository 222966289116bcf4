use mc_blockchain::Block;
use mc_transaction::Transaction;
use serde::{Deserialize, Serialize};

/// Messages passed between nodes on the [`crate::Network`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NetworkMessage {
    /// A block to be appended to the receiver's chain.
    Block(Block),

    /// A transaction for the receiver's pending pool.
    Transaction(Transaction),
}

/// Encode a [`NetworkMessage`] to bytes.
pub fn encode_message(msg: &NetworkMessage) -> Result<Vec<u8>, bincode::Error> {
    bincode::serialize(msg)
}

/// Decode bytes into a [`NetworkMessage`].
pub fn decode_message(bytes: &[u8]) -> Result<NetworkMessage, bincode::Error> {
    bincode::deserialize(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_survives_encoding_with_its_seal() {
        let tx = Transaction::new("Alice", "Bob", 100.0).unwrap();
        let mut block = Block::new(vec![tx], "0");
        block.mine(2);

        let bytes = encode_message(&NetworkMessage::Block(block.clone())).unwrap();
        let NetworkMessage::Block(decoded) = decode_message(&bytes).unwrap() else {
            panic!("expected a block");
        };

        assert_eq!(decoded, block);
        assert_eq!(decoded.compute_hash(), block.hash());
    }

    #[test]
    fn garbage_does_not_decode() {
        assert!(decode_message(&[0xff, 0xff, 0xff, 0xff, 0x01]).is_err());
    }
}
