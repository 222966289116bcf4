pub mod config;
pub mod error;
pub mod event;
pub mod network;
pub mod node;
pub mod protocol;

pub use config::{ConsensusKind, NodeConfig};
pub use error::NodeError;
pub use event::NodeEvent;
pub use network::Network;
pub use node::Node;
