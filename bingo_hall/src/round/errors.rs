//! Round operation errors.

use thiserror::Error;

use crate::db::StoreError;
use crate::game::card::CardError;
use crate::wallet::errors::WalletError;

/// Errors from round management operations (create, register, finalize,
/// status). Claim submission has its own taxonomy in
/// [`crate::claim::ClaimError`].
#[derive(Debug, Error)]
pub enum RoundError {
    #[error("round not found")]
    RoundNotFound,
    #[error("round schedule must satisfy open <= close <= play time")]
    InvalidSchedule,
    #[error("ticket price and prize amount must not be negative")]
    NegativeAmount,
    #[error("registration has not opened yet")]
    RegistrationNotOpen,
    #[error("registration is closed")]
    RegistrationClosed,
    #[error("already registered for this round")]
    AlreadyRegistered,
    #[error("not registered for this round")]
    NotRegistered,
    #[error("card setup only opens once registration closes")]
    NotInSetupWindow,
    #[error("card setup window has closed")]
    SetupWindowClosed,
    #[error("card was already finalized")]
    CardAlreadyFinalized,
    #[error("round actor is unavailable")]
    ActorUnavailable,
    #[error(transparent)]
    Card(#[from] CardError),
    #[error(transparent)]
    Wallet(#[from] WalletError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RoundError {
    /// Stable machine-readable reason code for API responses.
    pub fn reason_code(&self) -> &'static str {
        match self {
            RoundError::RoundNotFound => "round_not_found",
            RoundError::InvalidSchedule => "invalid_schedule",
            RoundError::NegativeAmount => "negative_amount",
            RoundError::RegistrationNotOpen => "registration_not_open",
            RoundError::RegistrationClosed => "registration_closed",
            RoundError::AlreadyRegistered => "already_registered",
            RoundError::NotRegistered => "not_registered",
            RoundError::NotInSetupWindow => "not_in_setup_window",
            RoundError::SetupWindowClosed => "setup_window_closed",
            RoundError::CardAlreadyFinalized => "card_already_finalized",
            RoundError::ActorUnavailable => "internal",
            RoundError::Card(_) => "invalid_card",
            RoundError::Wallet(WalletError::InsufficientBalance { .. }) => "insufficient_funds",
            RoundError::Wallet(_) => "wallet_error",
            RoundError::Store(_) => "internal",
        }
    }

    /// Client-safe message; storage errors are not leaked.
    pub fn client_message(&self) -> String {
        match self {
            RoundError::Store(_) | RoundError::ActorUnavailable => {
                "internal server error".to_string()
            }
            RoundError::Wallet(wallet) => wallet.client_message(),
            other => other.to_string(),
        }
    }
}
