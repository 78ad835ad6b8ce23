//! WebSocket gateway: room fan-out and presence tracking.
//!
//! The `/ws` endpoint upgrades an authenticated HTTP connection to a
//! WebSocket. Each connection is one transport session:
//!
//! - **Inbound events** are JSON text frames parsed as [`ClientEvent`]:
//!   presence registration, room join/leave, message relay, and pings.
//!   Malformed frames are logged and ignored.
//! - **Outbound events** multiplex three sources through `tokio::select!`:
//!   the rooms this session joined (a `StreamMap` of broadcast
//!   subscriptions), the global presence channel, and direct replies (pong).
//!
//! The gateway never re-authorizes relayed messages -- persistence already
//! did that; it only defaults the receive timestamp and unread flag before
//! fanning out to room members. Lagged receivers log a warning and keep
//! going.
//!
//! Disconnection drops all room subscriptions with the task -- reconnecting
//! clients must re-join their rooms. Presence is removed on disconnect, and
//! only when the user's last session is gone does the gateway broadcast an
//! offline status to all connected sessions.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamMap;

use parley_core::realtime::PresenceStore;
use parley_types::chat::ChatId;
use parley_types::event::{ClientEvent, ServerEvent};
use parley_types::presence::{SessionId, UserStatus};
use parley_types::user::UserId;

use crate::http::extractors::auth::AuthUser;
use crate::state::AppState;

/// Upgrade an HTTP request to a WebSocket connection.
///
/// This is mounted at `/ws` in the router. The upgrade itself is
/// authenticated; the session's identity is fixed from here on.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state, user_id))
}

/// Core WebSocket connection handler.
///
/// Uses `tokio::select!` to multiplex room broadcasts, global presence
/// transitions, and incoming client frames in a single task, enabling
/// bidirectional communication (e.g., responding to `Ping` with a pong).
async fn handle_ws_connection(socket: WebSocket, state: AppState, user_id: UserId) {
    let session_id = SessionId::new();
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Every session hears presence transitions; rooms are joined explicitly.
    let mut status_rx = state.rooms.subscribe_status();
    let mut rooms: StreamMap<ChatId, BroadcastStream<ServerEvent>> = StreamMap::new();

    loop {
        tokio::select! {
            // --- Branch 1: Forward joined rooms' broadcasts to the client ---
            Some((chat_id, item)) = rooms.next(), if !rooms.is_empty() => {
                match item {
                    Ok(event) => {
                        if send_event(&mut ws_sender, &event).await.is_err() {
                            // Client disconnected
                            break;
                        }
                    }
                    Err(BroadcastStreamRecvError::Lagged(n)) => {
                        tracing::warn!(
                            chat_id = %chat_id,
                            skipped = n,
                            "room subscriber lagged, skipping {n} events"
                        );
                        // Continue receiving -- the client will miss some
                        // messages but catches up with the next ones.
                    }
                }
            }

            // --- Branch 2: Forward global presence transitions ---
            status = status_rx.recv() => {
                match status {
                    Ok(event) => {
                        if send_event(&mut ws_sender, &event).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "status subscriber lagged, skipping {n} events");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        // Status sender dropped (server shutting down)
                        break;
                    }
                }
            }

            // --- Branch 3: Process frames from the client ---
            frame = ws_receiver.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        process_event(
                            &text,
                            &state,
                            user_id,
                            session_id,
                            &mut rooms,
                            &mut ws_sender,
                        ).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        // Client disconnected
                        break;
                    }
                    Some(Err(err)) => {
                        tracing::debug!("WebSocket receive error: {err}");
                        break;
                    }
                    // Ignore binary, ping, pong protocol frames (handled by axum/tungstenite)
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    // Room subscriptions die with this task. Presence outlives the loop only
    // if the user still has another session.
    if state.presence.disconnect(&user_id, &session_id) {
        state.rooms.publish_status(UserStatus {
            user_id,
            online: false,
        });
        tracing::info!(user_id = %user_id, "user went offline");
    }
    tracing::debug!(session_id = %session_id, "WebSocket connection closed");
}

/// Serialize and send one outbound event.
async fn send_event(
    ws_sender: &mut (impl SinkExt<Message, Error = axum::Error> + Unpin),
    event: &ServerEvent,
) -> Result<(), axum::Error> {
    match serde_json::to_string(event) {
        Ok(json) => ws_sender.send(Message::Text(json.into())).await,
        Err(err) => {
            tracing::warn!("Failed to serialize ServerEvent: {err}");
            Ok(())
        }
    }
}

/// Parse and process a single inbound event from the client.
async fn process_event(
    text: &str,
    state: &AppState,
    user_id: UserId,
    session_id: SessionId,
    rooms: &mut StreamMap<ChatId, BroadcastStream<ServerEvent>>,
    ws_sender: &mut (impl SinkExt<Message, Error = axum::Error> + Unpin),
) {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(err) => {
            tracing::warn!(
                raw = %text,
                error = %err,
                "Ignoring malformed WebSocket event"
            );
            return;
        }
    };

    match event {
        ClientEvent::UserOnline => {
            // First session flips the user online; later sessions are silent.
            if state.presence.connect(user_id, session_id) {
                state.rooms.publish_status(UserStatus {
                    user_id,
                    online: true,
                });
                tracing::info!(user_id = %user_id, "user came online");
            }
        }
        ClientEvent::JoinChat { chat_id } => {
            let rx = state.rooms.join(chat_id);
            rooms.insert(chat_id, BroadcastStream::new(rx));
            tracing::debug!(session_id = %session_id, chat_id = %chat_id, "joined room");
        }
        ClientEvent::LeaveChat { chat_id } => {
            rooms.remove(&chat_id);
            tracing::debug!(session_id = %session_id, chat_id = %chat_id, "left room");
        }
        ClientEvent::SendMessage { message } => {
            // Relay only: the message was authorized and persisted over REST.
            let message = message.into_message(Utc::now());
            let chat_id = message.chat_id;
            let reached = state
                .rooms
                .publish(&chat_id, ServerEvent::ReceiveMessage { message });
            tracing::debug!(chat_id = %chat_id, reached, "relayed message to room");
        }
        ClientEvent::Ping => {
            if send_event(ws_sender, &ServerEvent::Pong).await.is_err() {
                tracing::debug!("Failed to send pong (client disconnecting)");
            }
        }
    }
}
