//! Round manager: spawns and tracks every live round actor, and carries the
//! registration and card-setup operations that run outside the actors.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::claim::{ClaimError, ClaimReceipt};
use crate::db::{GameStore, StoreError};
use crate::game::card::{BallNumber, CardCells};
use crate::game::phase::RoundPhase;
use crate::wallet::WalletManager;

use super::actor::{RoundActor, RoundHandle};
use super::config::RoundTiming;
use super::errors::RoundError;
use super::models::{
    Card, CardId, Money, NewRound, Round, RoundId, RoundStatus, RoundSummary, UserId,
};

/// Round manager owning the handle for every live round.
pub struct RoundManager {
    store: Arc<dyn GameStore>,
    wallets: Arc<WalletManager>,
    timing: RoundTiming,
    rounds: RwLock<HashMap<RoundId, RoundHandle>>,
}

impl RoundManager {
    pub fn new(store: Arc<dyn GameStore>, wallets: Arc<WalletManager>, timing: RoundTiming) -> Self {
        Self {
            store,
            wallets,
            timing,
            rounds: RwLock::new(HashMap::new()),
        }
    }

    /// Load every active round from the store and spawn its actor,
    /// resuming each round's persisted drawn sequence. Returns the number
    /// of rounds now live.
    pub async fn load_active_rounds(&self) -> Result<usize, RoundError> {
        let rounds = self.store.active_rounds().await?;
        let mut resumed = 0;
        for round in rounds {
            let drawn = self.store.drawn_numbers(round.id).await?;
            let round_id = round.id;
            let drawn_count = drawn.len();
            self.spawn_round(round, drawn).await;
            log::info!("resumed round {round_id} ({drawn_count} numbers already drawn)");
            resumed += 1;
        }
        Ok(resumed)
    }

    /// Spawn an actor for a round, or return the existing handle if the
    /// round is already live (idempotent start).
    async fn spawn_round(&self, round: Round, drawn: Vec<BallNumber>) -> RoundHandle {
        let mut rounds = self.rounds.write().await;
        if let Some(handle) = rounds.get(&round.id) {
            return handle.clone();
        }
        let (actor, handle) = RoundActor::new(round, drawn, self.timing.clone(), self.store.clone());
        rounds.insert(handle.round_id(), handle.clone());
        tokio::spawn(async move {
            actor.run().await;
        });
        handle
    }

    /// Create a round (administrator operation) and spawn its actor.
    pub async fn create_round(&self, new_round: NewRound) -> Result<RoundId, RoundError> {
        new_round.validate()?;
        let round_id = self.store.insert_round(&new_round).await?;
        let round = self
            .store
            .round(round_id)
            .await?
            .ok_or(RoundError::RoundNotFound)?;
        self.spawn_round(round, Vec::new()).await;
        log::info!("created round {round_id} '{}'", new_round.title);
        Ok(round_id)
    }

    /// Handle for a live round, if any.
    pub async fn round_handle(&self, round_id: RoundId) -> Option<RoundHandle> {
        self.rounds.read().await.get(&round_id).cloned()
    }

    /// Number of live round actors.
    pub async fn live_round_count(&self) -> usize {
        self.rounds.read().await.len()
    }

    /// Active rounds with participant counts.
    pub async fn list_rounds(&self) -> Result<Vec<RoundSummary>, RoundError> {
        Ok(self.store.round_summaries().await?)
    }

    /// Register a user for a round: deduct the ticket price, then create
    /// their empty card. The card's unique (user, round) constraint is the
    /// authority on double registration; if it fires after the debit, the
    /// ticket is refunded.
    pub async fn register(&self, round_id: RoundId, user_id: UserId) -> Result<CardId, RoundError> {
        let round = self
            .store
            .round(round_id)
            .await?
            .ok_or(RoundError::RoundNotFound)?;
        let now = Utc::now();
        match round.phase(now) {
            RoundPhase::Registration => {
                if now < round.schedule.registration_opens_at {
                    return Err(RoundError::RegistrationNotOpen);
                }
            }
            _ => return Err(RoundError::RegistrationClosed),
        }

        let key = format!("ticket_{round_id}_{user_id}_{}", Uuid::new_v4());
        self.wallets
            .charge_ticket(user_id, round_id, round.ticket_price, key)
            .await?;

        match self.store.create_card(round_id, user_id).await {
            Ok(card_id) => {
                log::info!(
                    "user {user_id} registered for round {round_id} (card {card_id}, ticket {})",
                    round.ticket_price
                );
                Ok(card_id)
            }
            Err(StoreError::Conflict(_)) => {
                self.refund(round_id, user_id, round.ticket_price).await;
                Err(RoundError::AlreadyRegistered)
            }
            Err(e) => {
                self.refund(round_id, user_id, round.ticket_price).await;
                Err(e.into())
            }
        }
    }

    async fn refund(&self, round_id: RoundId, user_id: UserId, amount: Money) {
        let key = format!("ticket_refund_{round_id}_{user_id}_{}", Uuid::new_v4());
        if let Err(e) = self
            .wallets
            .refund_ticket(user_id, round_id, amount, key)
            .await
        {
            log::error!(
                "CRITICAL: failed to refund ticket for user {user_id} on round {round_id}: {e}"
            );
        }
    }

    /// Finalize a user's card cells. Only allowed during the lobby window
    /// and before the setup deadline; the submitted values go through the
    /// normalization policy, and the result is persisted exactly once.
    pub async fn finalize_card(
        &self,
        round_id: RoundId,
        user_id: UserId,
        raw_cells: &[String],
    ) -> Result<CardCells, RoundError> {
        let round = self
            .store
            .round(round_id)
            .await?
            .ok_or(RoundError::RoundNotFound)?;
        let now = Utc::now();
        match round.phase(now) {
            RoundPhase::LobbyWait => {}
            RoundPhase::Registration => return Err(RoundError::NotInSetupWindow),
            _ => return Err(RoundError::SetupWindowClosed),
        }
        if now > round.schedule.card_setup_deadline(self.timing.setup_window) {
            return Err(RoundError::SetupWindowClosed);
        }

        let card = self
            .store
            .card_for_user(round_id, user_id)
            .await?
            .ok_or(RoundError::NotRegistered)?;
        if card.cells.is_some() {
            return Err(RoundError::CardAlreadyFinalized);
        }

        let cells = CardCells::normalized(raw_cells)?;
        match self.store.finalize_card(card.id, &cells).await {
            Ok(()) => {
                log::info!("user {user_id} finalized card {} for round {round_id}", card.id);
                Ok(cells)
            }
            Err(StoreError::Conflict(_)) => Err(RoundError::CardAlreadyFinalized),
            Err(e) => Err(e.into()),
        }
    }

    /// The caller's card for a round.
    pub async fn card_for_user(&self, round_id: RoundId, user_id: UserId) -> Result<Card, RoundError> {
        if self.store.round(round_id).await?.is_none() {
            return Err(RoundError::RoundNotFound);
        }
        self.store
            .card_for_user(round_id, user_id)
            .await?
            .ok_or(RoundError::NotRegistered)
    }

    /// Submit a win claim, resolved by the round's actor.
    pub async fn submit_claim(
        &self,
        round_id: RoundId,
        user_id: UserId,
    ) -> Result<ClaimReceipt, ClaimError> {
        let handle = self
            .round_handle(round_id)
            .await
            .ok_or(ClaimError::RoundNotFound)?;
        handle.submit_claim(user_id).await
    }

    /// Full round status: derived phase, drawn sequence, and participants.
    pub async fn status(&self, round_id: RoundId) -> Result<RoundStatus, RoundError> {
        let round = self
            .store
            .round(round_id)
            .await?
            .ok_or(RoundError::RoundNotFound)?;

        // Live rounds answer from the actor; completed rounds fall back to
        // the store so old rounds stay queryable across restarts.
        let (drawn, winner, connected, phase) = match self.round_handle(round_id).await {
            Some(handle) => {
                let snapshot = handle.snapshot().await?;
                (
                    snapshot.drawn,
                    snapshot.winner_user_id,
                    snapshot.connected_sessions,
                    snapshot.phase,
                )
            }
            None => (
                self.store.drawn_numbers(round_id).await?,
                round.winner_user_id,
                0,
                round.phase(Utc::now()),
            ),
        };
        let participants = self.store.participants(round_id).await?;

        Ok(RoundStatus {
            round_id,
            title: round.title,
            phase,
            is_drawing: phase.is_drawing(),
            drawn,
            winner_user_id: winner,
            participants,
            connected_sessions: connected,
            schedule: round.schedule,
            ticket_price: round.ticket_price,
            prize_amount: round.prize_amount,
        })
    }
}
