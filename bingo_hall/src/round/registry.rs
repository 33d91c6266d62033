//! Per-round session registry.
//!
//! Tracks which sessions are subscribed to a round's broadcast channel and
//! delivers events to all of them in draw order. The registry lives inside
//! the round's actor, so joins, leaves, and broadcasts are naturally
//! serialized with the draws they observe.

use std::collections::HashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::messages::RoundEvent;

/// Session ID type
pub type SessionId = Uuid;

/// The set of sessions currently joined to one round.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, mpsc::Sender<RoundEvent>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session. A second join with the same id replaces the old
    /// sender, which covers a reconnect reusing its session id.
    pub fn join(&mut self, session_id: SessionId, sender: mpsc::Sender<RoundEvent>) {
        self.sessions.insert(session_id, sender);
        log::debug!("session {session_id} joined ({} connected)", self.sessions.len());
    }

    /// Remove a session; unknown ids are ignored.
    pub fn leave(&mut self, session_id: SessionId) {
        if self.sessions.remove(&session_id).is_some() {
            log::debug!("session {session_id} left ({} connected)", self.sessions.len());
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Deliver an event to every joined session.
    ///
    /// Delivery failure is per-session and never aborts the broadcast: a
    /// closed channel means the session disconnected, and a full channel
    /// means the session cannot keep up with the ordered stream — both are
    /// dropped and must resynchronize through a fresh join snapshot.
    pub fn broadcast(&mut self, event: &RoundEvent) {
        self.sessions.retain(|session_id, sender| {
            match sender.try_send(event.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    log::warn!("session {session_id} fell behind, dropping subscription");
                    false
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    log::debug!("session {session_id} disconnected, removing");
                    false
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::card::BallNumber;

    fn drawn_event(value: u8) -> RoundEvent {
        let number = BallNumber::new(value).unwrap();
        RoundEvent::NumberDrawn {
            number,
            drawn: vec![number],
        }
    }

    #[tokio::test]
    async fn broadcast_reaches_joined_sessions_in_order() {
        let mut registry = SessionRegistry::new();
        let (tx, mut rx) = mpsc::channel(8);
        registry.join(Uuid::new_v4(), tx);

        registry.broadcast(&drawn_event(1));
        registry.broadcast(&drawn_event(2));

        assert_eq!(rx.recv().await, Some(drawn_event(1)));
        assert_eq!(rx.recv().await, Some(drawn_event(2)));
    }

    #[tokio::test]
    async fn leave_is_idempotent_and_isolates_sessions() {
        let mut registry = SessionRegistry::new();
        let staying = Uuid::new_v4();
        let leaving = Uuid::new_v4();
        let (tx1, mut rx1) = mpsc::channel(8);
        let (tx2, mut rx2) = mpsc::channel(8);
        registry.join(staying, tx1);
        registry.join(leaving, tx2);

        registry.leave(leaving);
        registry.leave(leaving);
        assert_eq!(registry.len(), 1);

        registry.broadcast(&drawn_event(3));
        assert_eq!(rx1.recv().await, Some(drawn_event(3)));
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn dead_and_saturated_sessions_are_pruned() {
        let mut registry = SessionRegistry::new();

        let (closed_tx, closed_rx) = mpsc::channel(1);
        drop(closed_rx);
        registry.join(Uuid::new_v4(), closed_tx);

        let (full_tx, _full_rx) = mpsc::channel(1);
        full_tx.try_send(drawn_event(1)).unwrap();
        registry.join(Uuid::new_v4(), full_tx);

        let (ok_tx, mut ok_rx) = mpsc::channel(8);
        registry.join(Uuid::new_v4(), ok_tx);

        registry.broadcast(&drawn_event(2));
        assert_eq!(registry.len(), 1);
        assert_eq!(ok_rx.recv().await, Some(drawn_event(2)));
    }
}
