//! Wallet data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::round::models::{Money, RoundId, UserId};

/// Wallet model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub user_id: UserId,
    pub balance: Money,
    pub updated_at: DateTime<Utc>,
}

/// Transaction type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxType {
    /// User deposit, reviewed manually outside the core.
    Deposit,
    /// Ticket price deducted on round registration.
    Ticket,
    /// Prize from a win claim, pending administrator payout.
    Win,
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxType::Deposit => write!(f, "deposit"),
            TxType::Ticket => write!(f, "ticket"),
            TxType::Win => write!(f, "win"),
        }
    }
}

/// Transaction status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxStatus::Pending => write!(f, "pending"),
            TxStatus::Approved => write!(f, "approved"),
            TxStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// A ledger row to be inserted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub user_id: UserId,
    pub round_id: Option<RoundId>,
    pub tx_type: TxType,
    pub amount: Money,
    pub status: TxStatus,
    /// Unique key preventing the same logical operation from being
    /// recorded twice.
    pub idempotency_key: String,
}
