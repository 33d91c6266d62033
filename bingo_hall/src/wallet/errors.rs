//! Wallet error types.

use thiserror::Error;

use crate::db::StoreError;
use crate::round::models::{Money, UserId};

/// Wallet errors
#[derive(Debug, Error)]
pub enum WalletError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("wallet not found for user {0}")]
    WalletNotFound(UserId),

    #[error("insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: Money, required: Money },

    #[error("invalid amount: {0}")]
    InvalidAmount(Money),

    #[error("duplicate transaction: {0}")]
    DuplicateTransaction(String),
}

impl WalletError {
    /// Client-safe error message that does not leak storage details or ids.
    pub fn client_message(&self) -> String {
        match self {
            WalletError::Store(_) => "internal server error".to_string(),
            WalletError::WalletNotFound(_) => "wallet not found".to_string(),
            other => other.to_string(),
        }
    }
}

/// Result type for wallet operations
pub type WalletResult<T> = Result<T, WalletError>;
