//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::util::rate_limit::SessionRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, Position, ServerMsg};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Display name; a placeholder is generated when absent
    pub name: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, query.name, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, name: Option<String>, state: AppState) {
    let player_id = Uuid::new_v4();
    let display_name =
        name.unwrap_or_else(|| format!("Player_{}", &player_id.to_string()[..8]));

    info!(player_id = %player_id, name = %display_name, "New WebSocket connection");

    let (mut ws_sink, ws_stream) = socket.split();

    // Welcome goes to this socket only; everything else arrives via the
    // shared broadcast channel
    let welcome = ServerMsg::Welcome {
        player_id,
        server_time: unix_millis(),
    };
    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(player_id = %player_id, error = %e, "Failed to send welcome");
        return;
    }

    if !state.coordinator.join(player_id, display_name) {
        return;
    }

    let events_rx = state.broadcast.subscribe();
    run_session(player_id, ws_sink, ws_stream, events_rx, &state).await;

    // Cleanup on disconnect
    state.coordinator.leave(player_id);

    info!(player_id = %player_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    player_id: Uuid,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    mut events_rx: broadcast::Receiver<ServerMsg>,
    state: &AppState,
) {
    let rate_limiter = SessionRateLimiter::new();

    // Writer task: broadcast events -> WebSocket
    let writer_player_id = player_id;
    let writer_handle = tokio::spawn(async move {
        loop {
            match events_rx.recv().await {
                Ok(msg) => {
                    if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                        debug!(player_id = %writer_player_id, error = %e, "WebSocket send failed");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    // Fire-and-forget channel; a lagged observer just misses
                    // events and reconciles through the pull queries
                    warn!(player_id = %writer_player_id, lagged_count = n, "Client lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(player_id = %writer_player_id, "Broadcast channel closed");
                    break;
                }
            }
        }
    });

    // Reader loop: WebSocket -> coordinator
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    warn!(player_id = %player_id, "Rate limited input message");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(ClientMsg::Position { x, z }) => {
                        state
                            .coordinator
                            .record_position(player_id, Position::new(x, z));
                    }
                    Ok(ClientMsg::SetMode { mode }) => {
                        if !state.coordinator.request_mode_change(mode) {
                            debug!(player_id = %player_id, ?mode, "Mode change rejected");
                        }
                    }
                    Ok(ClientMsg::Leave) => {
                        info!(player_id = %player_id, "Client requested leave");
                        break;
                    }
                    Err(e) => {
                        warn!(player_id = %player_id, error = %e, "Failed to parse client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(player_id = %player_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(player_id = %player_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(player_id = %player_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    writer_handle.abort();
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
