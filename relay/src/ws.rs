//! WebSocket handler — board broadcast relay.
//!
//! DESIGN
//! ======
//! On upgrade the client names its board and participant id in the query
//! string, then enters a `select!` loop:
//! - Inbound client frames → validate + fan out to board peers
//! - Broadcast messages from peers → forward down the socket
//!
//! `process_inbound` is pure relay logic — it validates a frame against the
//! connection's board and participant and mutates room state — so tests can
//! exercise the whole relay without a socket.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → client joins its board room
//! 2. Client sends a `track` frame → roster synced to everyone
//! 3. Client sends `event` frames → relayed to peers, never echoed back
//! 4. Close → part + presence resync to the remaining peers

#[cfg(test)]
#[path = "ws_test.rs"]
mod ws_test;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use wire::{ChannelMessage, ClientFrame, PROTOCOL_VERSION, ParticipantId};

use crate::state::RelayState;

/// Outbound queue depth per client. A client that stalls longer than this
/// many frames starts losing them.
const CLIENT_QUEUE: usize = 256;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub board: Uuid,
    pub participant: ParticipantId,
}

pub async fn handle_ws(
    State(state): State<RelayState>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state, params.board, params.participant))
}

async fn run_ws(mut socket: WebSocket, state: RelayState, board_id: Uuid, participant: ParticipantId) {
    let (client_tx, mut client_rx) = mpsc::channel::<ChannelMessage>(CLIENT_QUEUE);
    state.join(board_id, participant, client_tx).await;

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        process_inbound(&state, board_id, participant, &text).await;
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(message) = client_rx.recv() => {
                let Ok(text) = serde_json::to_string(&message) else { continue };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        }
    }

    state.part(board_id, participant).await;
    info!(%board_id, %participant, "ws: client disconnected");
}

/// Validate and apply one inbound text frame. Invalid frames are logged and
/// dropped; the relay never guesses at intent.
pub(crate) async fn process_inbound(
    state: &RelayState,
    board_id: Uuid,
    participant: ParticipantId,
    text: &str,
) {
    let frame: ClientFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(err) => {
            warn!(%participant, %err, "ws: malformed inbound frame dropped");
            return;
        }
    };

    match frame {
        ClientFrame::Event { envelope } => {
            if envelope.version != PROTOCOL_VERSION {
                warn!(%participant, version = envelope.version, "ws: unsupported protocol version dropped");
                return;
            }
            if envelope.board_id != board_id {
                warn!(%participant, envelope_board = %envelope.board_id, "ws: envelope for another board dropped");
                return;
            }
            if envelope.from != participant {
                warn!(%participant, claimed = %envelope.from, "ws: spoofed sender dropped");
                return;
            }
            state.broadcast(board_id, envelope).await;
        }
        ClientFrame::Track { record } => {
            if record.participant.id != participant {
                warn!(%participant, claimed = %record.participant.id, "ws: spoofed presence dropped");
                return;
            }
            state.track(board_id, record).await;
        }
    }
}
