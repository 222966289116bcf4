pub mod error;
pub mod transaction;

pub use error::TransactionError;
pub use transaction::Transaction;
