//! Round actor: the draw engine and the claim arbiter for one round.
//!
//! Each live round is owned by exactly one actor task. Draw ticks and claim
//! submissions both go through the actor, so the drawn-number sequence and
//! the completion flag are only ever touched from one place; a draw can
//! never land after a win completed the round, and two claims can never
//! interleave their check-then-record sequences.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use crate::claim::{ClaimError, ClaimReceipt, ClaimStatus};
use crate::db::GameStore;
use crate::game::card::{BallNumber, winning_line};
use crate::game::constants::NUMBER_POOL_SIZE;
use crate::wallet::{NewTransaction, TxStatus, TxType};

use super::config::RoundTiming;
use super::errors::RoundError;
use super::messages::{RoundEvent, RoundMessage, RoundSnapshot};
use super::models::{Round, RoundId, UserId};
use super::registry::{SessionId, SessionRegistry};

const INBOX_CAPACITY: usize = 64;

/// Round actor handle for sending messages
#[derive(Clone)]
pub struct RoundHandle {
    sender: mpsc::Sender<RoundMessage>,
    round_id: RoundId,
}

impl RoundHandle {
    pub fn round_id(&self) -> RoundId {
        self.round_id
    }

    /// Send a message to the round actor.
    pub async fn send(&self, message: RoundMessage) -> Result<(), RoundError> {
        self.sender
            .send(message)
            .await
            .map_err(|_| RoundError::ActorUnavailable)
    }

    /// Subscribe a session and receive the joining snapshot.
    pub async fn join(
        &self,
        session_id: SessionId,
        events: mpsc::Sender<RoundEvent>,
    ) -> Result<RoundSnapshot, RoundError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoundMessage::Join {
            session_id,
            events,
            response: tx,
        })
        .await?;
        rx.await.map_err(|_| RoundError::ActorUnavailable)
    }

    /// Unsubscribe a session; idempotent.
    pub async fn leave(&self, session_id: SessionId) -> Result<(), RoundError> {
        self.send(RoundMessage::Leave { session_id }).await
    }

    /// Get the current draw-state snapshot.
    pub async fn snapshot(&self) -> Result<RoundSnapshot, RoundError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoundMessage::Snapshot { response: tx }).await?;
        rx.await.map_err(|_| RoundError::ActorUnavailable)
    }

    /// Submit a win claim and wait for the verdict.
    pub async fn submit_claim(&self, user_id: UserId) -> Result<ClaimReceipt, ClaimError> {
        let (tx, rx) = oneshot::channel();
        let message = RoundMessage::SubmitClaim {
            user_id,
            response: tx,
        };
        if self.sender.send(message).await.is_err() {
            log::warn!("round {}: claim sent to a stopped actor", self.round_id);
            return Err(ClaimError::RoundNotFound);
        }
        match rx.await {
            Ok(result) => result,
            Err(_) => Err(ClaimError::RoundNotFound),
        }
    }
}

/// Round actor owning one round's live state.
pub struct RoundActor {
    round: Round,
    timing: RoundTiming,
    /// Ordered, duplicate-free sequence of drawn numbers; append-only.
    drawn: Vec<BallNumber>,
    /// Undrawn remainder of the pool. Drawing picks uniformly from here,
    /// which guarantees termination within the pool size and no repeats.
    remaining: Vec<BallNumber>,
    registry: SessionRegistry,
    inbox: mpsc::Receiver<RoundMessage>,
    store: Arc<dyn GameStore>,
    rng: StdRng,
}

impl RoundActor {
    /// Create an actor for a round, resuming from an already-drawn prefix
    /// when the process restarted mid-round.
    pub fn new(
        round: Round,
        drawn: Vec<BallNumber>,
        timing: RoundTiming,
        store: Arc<dyn GameStore>,
    ) -> (Self, RoundHandle) {
        let (sender, inbox) = mpsc::channel(INBOX_CAPACITY);
        let handle = RoundHandle {
            sender,
            round_id: round.id,
        };

        let remaining = (BallNumber::MIN..=BallNumber::MAX)
            .filter_map(|value| BallNumber::new(value).ok())
            .filter(|number| !drawn.contains(number))
            .collect();

        let actor = Self {
            round,
            timing,
            drawn,
            remaining,
            registry: SessionRegistry::new(),
            inbox,
            store,
            rng: StdRng::from_os_rng(),
        };

        (actor, handle)
    }

    /// Run the actor event loop until every handle is dropped.
    pub async fn run(mut self) {
        log::info!(
            "round {} '{}' actor starting ({} drawn)",
            self.round.id,
            self.round.title,
            self.drawn.len()
        );

        // First draw happens one full interval after spawn, not
        // immediately; late ticks do not burst to catch up.
        let mut ticks = interval_at(
            Instant::now() + self.timing.draw_interval,
            self.timing.draw_interval,
        );
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                message = self.inbox.recv() => {
                    match message {
                        Some(message) => self.handle_message(message).await,
                        None => break,
                    }
                }
                _ = ticks.tick() => {
                    self.tick().await;
                }
            }
        }

        log::info!("round {} actor stopped", self.round.id);
    }

    async fn handle_message(&mut self, message: RoundMessage) {
        match message {
            RoundMessage::Join {
                session_id,
                events,
                response,
            } => {
                self.registry.join(session_id, events);
                let _ = response.send(self.snapshot());
            }

            RoundMessage::Leave { session_id } => {
                self.registry.leave(session_id);
            }

            RoundMessage::Snapshot { response } => {
                let _ = response.send(self.snapshot());
            }

            RoundMessage::SubmitClaim { user_id, response } => {
                let result = self.handle_claim(user_id).await;
                let _ = response.send(result);
            }
        }
    }

    fn snapshot(&self) -> RoundSnapshot {
        let phase = self.round.phase(Utc::now());
        RoundSnapshot {
            round_id: self.round.id,
            phase,
            is_drawing: phase.is_drawing(),
            drawn: self.drawn.clone(),
            winner_user_id: self.round.winner_user_id,
            connected_sessions: self.registry.len(),
        }
    }

    /// Draw-cadence tick. Only draws while the derived phase is `Drawing`,
    /// so completion (win or exhaustion) halts the loop without any flag
    /// juggling.
    async fn tick(&mut self) {
        if !self.round.phase(Utc::now()).is_drawing() {
            return;
        }
        self.draw_number().await;
    }

    async fn draw_number(&mut self) {
        if self.remaining.is_empty() {
            return;
        }
        let index = self.rng.random_range(0..self.remaining.len());
        let number = self.remaining.swap_remove(index);
        self.drawn.push(number);

        // Persistence failure is logged, not fatal: the in-memory sequence
        // stays authoritative for this round's lifetime.
        if let Err(e) = self
            .store
            .append_drawn(self.round.id, number, self.drawn.len() - 1)
            .await
        {
            log::error!("round {}: failed to persist draw {number}: {e}", self.round.id);
        }

        log::debug!(
            "round {}: drew {number} ({}/{NUMBER_POOL_SIZE})",
            self.round.id,
            self.drawn.len()
        );

        self.registry.broadcast(&RoundEvent::NumberDrawn {
            number,
            drawn: self.drawn.clone(),
        });

        if self.remaining.is_empty() {
            log::info!("round {}: number pool exhausted", self.round.id);
            self.finish_round(None).await;
        }
    }

    /// Terminate the round and broadcast the terminal event. With a winner,
    /// `record_win` has already persisted completion; exhaustion persists
    /// it here.
    async fn finish_round(&mut self, winner: Option<UserId>) {
        if winner.is_none() {
            if let Err(e) = self.store.complete_round(self.round.id).await {
                log::error!("round {}: failed to persist completion: {e}", self.round.id);
            }
        }
        self.round.is_active = false;
        self.round.winner_user_id = winner.or(self.round.winner_user_id);

        self.registry.broadcast(&RoundEvent::RoundEnded {
            round_id: self.round.id,
            winner_user_id: self.round.winner_user_id,
        });

        log::info!(
            "round {} ended after {} draws, winner: {:?}",
            self.round.id,
            self.drawn.len(),
            self.round.winner_user_id
        );
    }

    /// The authoritative claim protocol. Runs to completion before the
    /// actor touches its inbox again, so concurrent claims for this round
    /// are fully serialized.
    async fn handle_claim(&mut self, user_id: UserId) -> Result<ClaimReceipt, ClaimError> {
        if self.round.winner_user_id.is_some() {
            return Err(ClaimError::RoundAlreadyWon);
        }
        if !self.round.phase(Utc::now()).is_drawing() {
            return Err(ClaimError::RoundNotDrawing);
        }

        let card = self
            .store
            .card_for_user(self.round.id, user_id)
            .await?
            .ok_or(ClaimError::NoCardFound)?;
        if card.claim_status.is_some() {
            return Err(ClaimError::AlreadyResolved);
        }

        // Server-side re-evaluation, regardless of what the client saw.
        let satisfied = card
            .cells
            .as_ref()
            .and_then(|cells| winning_line(cells, &self.drawn));

        let Some(line) = satisfied else {
            self.record_rejection(user_id).await;
            return Err(ClaimError::NotAWinningCard);
        };

        let won = self
            .store
            .record_win(self.round.id, user_id, card.id, self.round.prize_amount)
            .await?;
        if !won {
            // Another process recorded a winner first; treat exactly like
            // losing the in-process race.
            return Err(ClaimError::RoundAlreadyWon);
        }

        log::info!(
            "round {}: user {user_id} wins on line {line} after {} draws",
            self.round.id,
            self.drawn.len()
        );

        let receipt = ClaimReceipt {
            round_id: self.round.id,
            card_id: card.id,
            award: self.round.prize_amount,
            status: ClaimStatus::Pending,
        };
        self.finish_round(Some(user_id)).await;
        Ok(receipt)
    }

    /// Persist a rejected claim so every submission leaves an auditable
    /// accept/reject record.
    async fn record_rejection(&self, user_id: UserId) {
        let tx = NewTransaction {
            user_id,
            round_id: Some(self.round.id),
            tx_type: TxType::Win,
            amount: 0,
            status: TxStatus::Rejected,
            idempotency_key: format!("claim_{}_{user_id}_{}", self.round.id, uuid::Uuid::new_v4()),
        };
        if let Err(e) = self.store.insert_transaction(&tx).await {
            log::warn!(
                "round {}: failed to record rejected claim for user {user_id}: {e}",
                self.round.id
            );
        }
    }
}
