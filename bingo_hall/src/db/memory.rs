//! In-memory store used by tests and local experiments.
//!
//! Implements the same conditional-write semantics as the PostgreSQL
//! backend (unique card per (user, round), finalize-once, winner
//! compare-and-set, idempotent debits) over a single mutex-guarded state.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;

use super::repository::{DebitOutcome, RoundStore, StoreError, WalletStore};
use crate::game::card::{BallNumber, CardCells};
use crate::round::models::{Card, CardId, Money, NewRound, Round, RoundId, RoundSummary, UserId};
use crate::wallet::models::{NewTransaction, Wallet};

#[derive(Debug, Default)]
struct MemoryInner {
    next_round_id: RoundId,
    next_card_id: CardId,
    rounds: HashMap<RoundId, Round>,
    cards: HashMap<CardId, Card>,
    cards_by_user: HashMap<(RoundId, UserId), CardId>,
    drawn: HashMap<RoundId, Vec<BallNumber>>,
    wallets: HashMap<UserId, Money>,
    transactions: Vec<NewTransaction>,
    used_keys: HashSet<String>,
}

/// In-memory implementation of [`RoundStore`] and [`WalletStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All ledger rows recorded so far, in insertion order. Test hook.
    pub async fn transactions(&self) -> Vec<NewTransaction> {
        self.inner.lock().await.transactions.clone()
    }
}

#[async_trait]
impl RoundStore for MemoryStore {
    async fn insert_round(&self, round: &NewRound) -> Result<RoundId, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.next_round_id += 1;
        let id = inner.next_round_id;
        inner.rounds.insert(
            id,
            Round {
                id,
                title: round.title.clone(),
                schedule: round.schedule,
                ticket_price: round.ticket_price,
                prize_amount: round.prize_amount,
                is_active: true,
                winner_user_id: None,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn round(&self, round_id: RoundId) -> Result<Option<Round>, StoreError> {
        Ok(self.inner.lock().await.rounds.get(&round_id).cloned())
    }

    async fn active_rounds(&self) -> Result<Vec<Round>, StoreError> {
        let inner = self.inner.lock().await;
        let mut rounds: Vec<Round> = inner
            .rounds
            .values()
            .filter(|round| round.is_active)
            .cloned()
            .collect();
        rounds.sort_by_key(|round| round.id);
        Ok(rounds)
    }

    async fn round_summaries(&self) -> Result<Vec<RoundSummary>, StoreError> {
        let inner = self.inner.lock().await;
        let mut summaries: Vec<RoundSummary> = inner
            .rounds
            .values()
            .filter(|round| round.is_active)
            .map(|round| RoundSummary {
                id: round.id,
                title: round.title.clone(),
                schedule: round.schedule,
                ticket_price: round.ticket_price,
                prize_amount: round.prize_amount,
                is_active: round.is_active,
                participant_count: inner
                    .cards
                    .values()
                    .filter(|card| card.round_id == round.id)
                    .count() as i64,
                created_at: round.created_at,
            })
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }

    async fn create_card(&self, round_id: RoundId, user_id: UserId) -> Result<CardId, StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.cards_by_user.contains_key(&(round_id, user_id)) {
            return Err(StoreError::Conflict("card already exists for this round"));
        }
        inner.next_card_id += 1;
        let id = inner.next_card_id;
        inner.cards.insert(
            id,
            Card {
                id,
                user_id,
                round_id,
                cells: None,
                is_winner: false,
                claim_status: None,
                win_amount: 0,
                created_at: Utc::now(),
            },
        );
        inner.cards_by_user.insert((round_id, user_id), id);
        Ok(id)
    }

    async fn card_for_user(
        &self,
        round_id: RoundId,
        user_id: UserId,
    ) -> Result<Option<Card>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .cards_by_user
            .get(&(round_id, user_id))
            .and_then(|card_id| inner.cards.get(card_id))
            .cloned())
    }

    async fn finalize_card(&self, card_id: CardId, cells: &CardCells) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let card = inner
            .cards
            .get_mut(&card_id)
            .ok_or(StoreError::Conflict("card does not exist"))?;
        if card.cells.is_some() {
            return Err(StoreError::Conflict("card already finalized"));
        }
        card.cells = Some(cells.clone());
        Ok(())
    }

    async fn append_drawn(
        &self,
        round_id: RoundId,
        number: BallNumber,
        _position: usize,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.drawn.entry(round_id).or_default().push(number);
        Ok(())
    }

    async fn drawn_numbers(&self, round_id: RoundId) -> Result<Vec<BallNumber>, StoreError> {
        Ok(self
            .inner
            .lock()
            .await
            .drawn
            .get(&round_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn record_win(
        &self,
        round_id: RoundId,
        user_id: UserId,
        card_id: CardId,
        amount: Money,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        match inner.rounds.get_mut(&round_id) {
            Some(round) if round.is_active && round.winner_user_id.is_none() => {
                round.winner_user_id = Some(user_id);
                round.is_active = false;
            }
            _ => return Ok(false),
        }
        if let Some(card) = inner.cards.get_mut(&card_id) {
            card.is_winner = true;
            card.claim_status = Some(crate::claim::ClaimStatus::Pending);
            card.win_amount = amount;
        }
        inner.transactions.push(NewTransaction {
            user_id,
            round_id: Some(round_id),
            tx_type: crate::wallet::TxType::Win,
            amount,
            status: crate::wallet::TxStatus::Pending,
            idempotency_key: format!("win_{round_id}_{card_id}"),
        });
        Ok(true)
    }

    async fn complete_round(&self, round_id: RoundId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(round) = inner.rounds.get_mut(&round_id) {
            round.is_active = false;
        }
        Ok(())
    }

    async fn participants(&self, round_id: RoundId) -> Result<Vec<UserId>, StoreError> {
        let inner = self.inner.lock().await;
        let mut cards: Vec<&Card> = inner
            .cards
            .values()
            .filter(|card| card.round_id == round_id)
            .collect();
        cards.sort_by_key(|card| card.id);
        Ok(cards.iter().map(|card| card.user_id).collect())
    }
}

#[async_trait]
impl WalletStore for MemoryStore {
    async fn wallet(&self, user_id: UserId) -> Result<Option<Wallet>, StoreError> {
        Ok(self
            .inner
            .lock()
            .await
            .wallets
            .get(&user_id)
            .map(|&balance| Wallet {
                user_id,
                balance,
                updated_at: Utc::now(),
            }))
    }

    async fn upsert_wallet(&self, user_id: UserId, balance: Money) -> Result<(), StoreError> {
        self.inner.lock().await.wallets.insert(user_id, balance);
        Ok(())
    }

    async fn try_debit(
        &self,
        user_id: UserId,
        amount: Money,
        tx: &NewTransaction,
    ) -> Result<DebitOutcome, StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.used_keys.contains(&tx.idempotency_key) {
            return Ok(DebitOutcome::DuplicateKey);
        }
        let Some(&balance) = inner.wallets.get(&user_id) else {
            return Ok(DebitOutcome::NoWallet);
        };
        if balance < amount {
            return Ok(DebitOutcome::InsufficientFunds { available: balance });
        }
        let new_balance = balance - amount;
        inner.wallets.insert(user_id, new_balance);
        inner.used_keys.insert(tx.idempotency_key.clone());
        inner.transactions.push(tx.clone());
        Ok(DebitOutcome::Completed { new_balance })
    }

    async fn credit(
        &self,
        user_id: UserId,
        amount: Money,
        tx: &NewTransaction,
    ) -> Result<Option<Money>, StoreError> {
        let mut inner = self.inner.lock().await;
        let Some(&balance) = inner.wallets.get(&user_id) else {
            return Ok(None);
        };
        let new_balance = balance + amount;
        inner.wallets.insert(user_id, new_balance);
        inner.used_keys.insert(tx.idempotency_key.clone());
        inner.transactions.push(tx.clone());
        Ok(Some(new_balance))
    }

    async fn insert_transaction(&self, tx: &NewTransaction) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.used_keys.insert(tx.idempotency_key.clone());
        inner.transactions.push(tx.clone());
        Ok(())
    }
}
