pub mod block;
pub mod blockchain;
pub mod error;

pub use block::Block;
pub use blockchain::Blockchain;
pub use error::BlockchainError;

/// Previous-hash sentinel carried by the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Difficulty used by [`Blockchain::default`].
pub const DEFAULT_DIFFICULTY: usize = 2;

/// Difficulties at or above this are logged as impractical to mine.
pub const IMPRACTICAL_DIFFICULTY: usize = 16;
