use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransactionError {
    #[error("amount must be positive, got {0}")]
    InvalidAmount(f64),
}
