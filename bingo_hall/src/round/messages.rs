//! Round actor message types.

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use crate::claim::{ClaimError, ClaimReceipt};
use crate::game::card::BallNumber;
use crate::game::phase::RoundPhase;

use super::models::{RoundId, UserId};
use super::registry::SessionId;

/// Messages that can be sent to a `RoundActor`
#[derive(Debug)]
pub enum RoundMessage {
    /// Subscribe a session to this round's broadcast channel. The reply is
    /// the full current snapshot, so late joiners start prefix-consistent
    /// with everyone else.
    Join {
        session_id: SessionId,
        events: mpsc::Sender<RoundEvent>,
        response: oneshot::Sender<RoundSnapshot>,
    },

    /// Unsubscribe a session; idempotent.
    Leave { session_id: SessionId },

    /// Submit a win claim. Claims for one round are resolved strictly one
    /// at a time through this inbox.
    SubmitClaim {
        user_id: UserId,
        response: oneshot::Sender<Result<ClaimReceipt, ClaimError>>,
    },

    /// Get the current draw-state snapshot.
    Snapshot {
        response: oneshot::Sender<RoundSnapshot>,
    },
}

/// Events broadcast to every session subscribed to a round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoundEvent {
    /// A number was drawn. Carries the full ordered sequence so far, so a
    /// client that dropped an event can heal without resubscribing.
    NumberDrawn {
        number: BallNumber,
        drawn: Vec<BallNumber>,
    },

    /// Terminal event: a winner was confirmed or the pool ran out.
    RoundEnded {
        round_id: RoundId,
        winner_user_id: Option<UserId>,
    },
}

/// Point-in-time view of a round's draw state.
#[derive(Debug, Clone, Serialize)]
pub struct RoundSnapshot {
    pub round_id: RoundId,
    pub phase: RoundPhase,
    pub is_drawing: bool,
    pub drawn: Vec<BallNumber>,
    pub winner_user_id: Option<UserId>,
    pub connected_sessions: usize,
}
