//! Round and card data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::claim::models::ClaimStatus;
use crate::game::card::{BallNumber, CardCells};
use crate::game::phase::{RoundPhase, RoundSchedule};

use super::errors::RoundError;

/// Round ID type
pub type RoundId = i64;

/// User ID type (issued by the external auth layer)
pub type UserId = i64;

/// Card ID type
pub type CardId = i64;

/// Currency amount in the smallest unit
pub type Money = i64;

/// A scheduled bingo round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round {
    pub id: RoundId,
    pub title: String,
    pub schedule: RoundSchedule,
    pub ticket_price: Money,
    pub prize_amount: Money,
    /// Cleared when the round completes (win or pool exhaustion).
    pub is_active: bool,
    /// The first confirmed winner; set at most once, atomically.
    pub winner_user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Round {
    pub fn completed(&self) -> bool {
        !self.is_active || self.winner_user_id.is_some()
    }

    /// Derive the round's current phase. See [`RoundPhase::derive`].
    pub fn phase(&self, now: DateTime<Utc>) -> RoundPhase {
        RoundPhase::derive(&self.schedule, self.completed(), now)
    }
}

/// Parameters for creating a round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRound {
    pub title: String,
    pub schedule: RoundSchedule,
    pub ticket_price: Money,
    pub prize_amount: Money,
}

impl NewRound {
    pub fn validate(&self) -> Result<(), RoundError> {
        self.schedule
            .validate()
            .map_err(|_| RoundError::InvalidSchedule)?;
        if self.ticket_price < 0 || self.prize_amount < 0 {
            return Err(RoundError::NegativeAmount);
        }
        Ok(())
    }
}

/// Round listing entry with its participant count.
#[derive(Debug, Clone, Serialize)]
pub struct RoundSummary {
    pub id: RoundId,
    pub title: String,
    pub schedule: RoundSchedule,
    pub ticket_price: Money,
    pub prize_amount: Money,
    pub is_active: bool,
    pub participant_count: i64,
    pub created_at: DateTime<Utc>,
}

/// A user's card for one round. At most one exists per (user, round).
#[derive(Debug, Clone, Serialize)]
pub struct Card {
    pub id: CardId,
    pub user_id: UserId,
    pub round_id: RoundId,
    /// `None` until the card is finalized during the setup window;
    /// immutable afterwards.
    pub cells: Option<CardCells>,
    pub is_winner: bool,
    pub claim_status: Option<ClaimStatus>,
    pub win_amount: Money,
    pub created_at: DateTime<Utc>,
}

/// Full round status for the query/snapshot operation: the derived state,
/// the drawn sequence, and the registered participants.
#[derive(Debug, Clone, Serialize)]
pub struct RoundStatus {
    pub round_id: RoundId,
    pub title: String,
    pub phase: RoundPhase,
    pub is_drawing: bool,
    pub drawn: Vec<BallNumber>,
    pub winner_user_id: Option<UserId>,
    pub participants: Vec<UserId>,
    pub connected_sessions: usize,
    pub schedule: RoundSchedule,
    pub ticket_price: Money,
    pub prize_amount: Money,
}
