use std::fmt;

use serde::{Deserialize, Serialize};

use crate::TransactionError;

/// A transfer of `amount` from `sender` to `recipient`.
///
/// Transactions are validated when they are built and cannot be changed
/// afterwards: the fields are private and only exposed through read
/// accessors.  Deserialisation runs the same validation as [`Transaction::new`],
/// so a decoded transaction always carries a positive amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TransactionData")]
pub struct Transaction {
    sender: String,
    recipient: String,
    amount: f64,
}

/// Unchecked wire shape of a [`Transaction`].
#[derive(Deserialize)]
struct TransactionData {
    sender: String,
    recipient: String,
    amount: f64,
}

impl TryFrom<TransactionData> for Transaction {
    type Error = TransactionError;

    fn try_from(data: TransactionData) -> Result<Self, Self::Error> {
        Transaction::new(data.sender, data.recipient, data.amount)
    }
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Fails with [`TransactionError::InvalidAmount`] unless `amount` is a
    /// finite number greater than zero.
    pub fn new(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: f64,
    ) -> Result<Self, TransactionError> {
        if !(amount > 0.0 && amount.is_finite()) {
            return Err(TransactionError::InvalidAmount(amount));
        }

        Ok(Self {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
        })
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}: {}", self.sender, self.recipient, self.amount)
    }
}
