//! WebSocket handler for per-round live draw updates.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /ws/{round_id}`.
//! 2. The session joins the round's registry and immediately receives a
//!    full snapshot (`type: "snapshot"`), so late joiners and reconnects
//!    start prefix-consistent with everyone else.
//! 3. Every draw arrives as `type: "number_drawn"` with the number and the
//!    full ordered sequence; the terminal `type: "round_ended"` carries the
//!    winner, if any.
//! 4. Disconnect (or a `{"type":"leave"}` message) is an implicit leave;
//!    nothing is retained for the session, and a reconnect simply joins
//!    again for a fresh snapshot.
//!
//! The channel is read-only game state: claims and card operations go
//! through the HTTP API, where the win verification runs server-side.

use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use bingo_hall::constants::SESSION_EVENT_BUFFER;
use bingo_hall::round::{RoundHandle, RoundSnapshot};

use super::AppState;
use crate::metrics;

/// Client messages received via WebSocket
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    /// Leave the round channel. Closing the socket has the same effect.
    Leave,
}

/// Server-originated messages that are not broadcast events
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerMessage {
    Snapshot(RoundSnapshot),
}

/// Upgrade an HTTP connection to a WebSocket joined to one round's
/// broadcast channel. Returns `404` for rounds with no live actor.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Path(round_id): Path<i64>,
    State(state): State<AppState>,
) -> Response {
    match state.round_manager.round_handle(round_id).await {
        Some(handle) => ws.on_upgrade(move |socket| handle_socket(socket, handle)),
        None => (StatusCode::NOT_FOUND, "Round not found").into_response(),
    }
}

async fn handle_socket(socket: WebSocket, handle: RoundHandle) {
    let round_id = handle.round_id();
    let session_id = Uuid::new_v4();
    let (mut sender, mut receiver) = socket.split();

    let (event_tx, mut event_rx) = mpsc::channel(SESSION_EVENT_BUFFER);
    let snapshot = match handle.join(session_id, event_tx).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!("ws session {session_id}: failed to join round {round_id}: {e}");
            return;
        }
    };

    metrics::ws_session_opened();
    info!("ws session {session_id} joined round {round_id}");

    // The snapshot goes out before any live event so the client's view is
    // a prefix of the broadcast stream.
    let snapshot_sent = match serde_json::to_string(&ServerMessage::Snapshot(snapshot)) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            error!("ws session {session_id}: failed to serialize snapshot: {e}");
            false
        }
    };

    if snapshot_sent {
        loop {
            tokio::select! {
                event = event_rx.recv() => match event {
                    Some(event) => {
                        let json = match serde_json::to_string(&event) {
                            Ok(json) => json,
                            Err(e) => {
                                error!("ws session {session_id}: failed to serialize event: {e}");
                                continue;
                            }
                        };
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    // The registry dropped this session (closed or fell
                    // behind); the client must rejoin for a new snapshot.
                    None => break,
                },

                message = receiver.next() => match message {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::Leave) => break,
                            Err(e) => {
                                warn!("ws session {session_id}: unrecognized message: {e}");
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        error!("ws session {session_id}: {e}");
                        break;
                    }
                    Some(Ok(_)) => {}
                },
            }
        }
    }

    // Connection loss is an implicit leave.
    let _ = handle.leave(session_id).await;
    metrics::ws_session_closed();
    info!("ws session {session_id} left round {round_id}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use bingo_hall::game::card::BallNumber;
    use bingo_hall::round::RoundEvent;

    #[test]
    fn client_message_parses_leave() {
        let message: ClientMessage = serde_json::from_str(r#"{"type":"leave"}"#).unwrap();
        assert!(matches!(message, ClientMessage::Leave));
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"join"}"#).is_err());
    }

    #[test]
    fn broadcast_events_use_the_documented_wire_shape() {
        let number = BallNumber::new(7).unwrap();
        let event = RoundEvent::NumberDrawn {
            number,
            drawn: vec![number],
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "number_drawn");
        assert_eq!(json["number"], "07");
        assert_eq!(json["drawn"][0], "07");

        let ended = RoundEvent::RoundEnded {
            round_id: 3,
            winner_user_id: Some(11),
        };
        let json = serde_json::to_value(&ended).unwrap();
        assert_eq!(json["type"], "round_ended");
        assert_eq!(json["winner_user_id"], 11);
    }
}
