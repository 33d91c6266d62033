//! Claim error taxonomy.

use thiserror::Error;

use crate::db::StoreError;

/// Every way a claim submission can be rejected.
///
/// `RoundAlreadyWon` and `NotAWinningCard` are deliberately distinct so a
/// client can show "someone else won" versus "you haven't won yet".
#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("no card found for this round")]
    NoCardFound,
    #[error("a claim was already recorded for this card")]
    AlreadyResolved,
    #[error("card does not satisfy any winning line")]
    NotAWinningCard,
    #[error("another claim already won this round")]
    RoundAlreadyWon,
    #[error("round is not in its drawing phase")]
    RoundNotDrawing,
    #[error("round not found")]
    RoundNotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ClaimError {
    /// Stable machine-readable reason code for API responses.
    pub fn reason_code(&self) -> &'static str {
        match self {
            ClaimError::NoCardFound => "no_card_found",
            ClaimError::AlreadyResolved => "already_resolved",
            ClaimError::NotAWinningCard => "not_a_winning_card",
            ClaimError::RoundAlreadyWon => "round_already_won",
            ClaimError::RoundNotDrawing => "round_not_drawing",
            ClaimError::RoundNotFound => "round_not_found",
            ClaimError::Store(_) => "internal",
        }
    }

    /// Client-safe message; storage errors are not leaked.
    pub fn client_message(&self) -> String {
        match self {
            ClaimError::Store(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }
}
