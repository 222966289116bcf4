use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockchainError {
    #[error("block links to {found} but the chain tip is {expected}")]
    LinkageMismatch { expected: String, found: String },
}
