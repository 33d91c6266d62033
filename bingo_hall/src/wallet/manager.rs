//! Wallet manager: ticket charges and refunds over the ledger store.

use std::sync::Arc;

use super::errors::{WalletError, WalletResult};
use super::models::{NewTransaction, TxStatus, TxType, Wallet};
use crate::db::{DebitOutcome, WalletStore};
use crate::round::models::{Money, RoundId, UserId};

/// Wallet manager
///
/// All mutations go through conditional, idempotent store operations: a
/// debit only succeeds if the balance covers it and the idempotency key is
/// fresh, so a retried registration can never charge twice.
#[derive(Clone)]
pub struct WalletManager {
    store: Arc<dyn WalletStore>,
}

impl WalletManager {
    pub fn new(store: Arc<dyn WalletStore>) -> Self {
        Self { store }
    }

    /// Get wallet balance for a user.
    pub async fn get_wallet(&self, user_id: UserId) -> WalletResult<Wallet> {
        self.store
            .wallet(user_id)
            .await?
            .ok_or(WalletError::WalletNotFound(user_id))
    }

    /// Deduct a round's ticket price, recording an approved `ticket`
    /// transaction. Returns the new balance.
    pub async fn charge_ticket(
        &self,
        user_id: UserId,
        round_id: RoundId,
        amount: Money,
        idempotency_key: String,
    ) -> WalletResult<Money> {
        if amount < 0 {
            return Err(WalletError::InvalidAmount(amount));
        }
        let tx = NewTransaction {
            user_id,
            round_id: Some(round_id),
            tx_type: TxType::Ticket,
            amount,
            status: TxStatus::Approved,
            idempotency_key,
        };
        match self.store.try_debit(user_id, amount, &tx).await? {
            DebitOutcome::Completed { new_balance } => Ok(new_balance),
            DebitOutcome::InsufficientFunds { available } => {
                Err(WalletError::InsufficientBalance {
                    available,
                    required: amount,
                })
            }
            DebitOutcome::NoWallet => Err(WalletError::WalletNotFound(user_id)),
            DebitOutcome::DuplicateKey => {
                Err(WalletError::DuplicateTransaction(tx.idempotency_key))
            }
        }
    }

    /// Return a ticket charge after a failed registration. Returns the new
    /// balance.
    pub async fn refund_ticket(
        &self,
        user_id: UserId,
        round_id: RoundId,
        amount: Money,
        idempotency_key: String,
    ) -> WalletResult<Money> {
        if amount < 0 {
            return Err(WalletError::InvalidAmount(amount));
        }
        let tx = NewTransaction {
            user_id,
            round_id: Some(round_id),
            tx_type: TxType::Ticket,
            amount: -amount,
            status: TxStatus::Approved,
            idempotency_key,
        };
        self.store
            .credit(user_id, amount, &tx)
            .await?
            .ok_or(WalletError::WalletNotFound(user_id))
    }
}
