//! Claim data models.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::round::models::{CardId, Money, RoundId};

/// Card-level claim state. A card without a submitted winning claim has no
/// status at all (`Option<ClaimStatus>` is `None`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimStatus {
    /// Win recorded, payout awaiting administrator review.
    Pending,
    /// Payout review finished (administrator side, out of core scope).
    Resolved,
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClaimStatus::Pending => write!(f, "pending"),
            ClaimStatus::Resolved => write!(f, "resolved"),
        }
    }
}

impl FromStr for ClaimStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ClaimStatus::Pending),
            "resolved" => Ok(ClaimStatus::Resolved),
            other => Err(format!("unknown claim status '{other}'")),
        }
    }
}

/// Returned to the claimant when their claim is accepted.
#[derive(Debug, Clone, Serialize)]
pub struct ClaimReceipt {
    pub round_id: RoundId,
    pub card_id: CardId,
    /// The round's configured prize amount, pending administrator payout.
    pub award: Money,
    pub status: ClaimStatus,
}
