//! Gateway wire events.
//!
//! Clients and server exchange JSON text frames tagged by `type`. Inbound
//! frames are [`ClientEvent`]; outbound frames are [`ServerEvent`]. Unknown or
//! malformed frames are logged and ignored by the gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chat::ChatId;
use crate::message::{Message, MessageId};
use crate::presence::UserStatus;
use crate::user::UserId;

/// Inbound event from a connected client.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Presence signal: register this session for the authenticated user.
    UserOnline,
    /// Join the room for a chat; required before receiving its broadcasts.
    JoinChat { chat_id: ChatId },
    /// Leave a chat's room.
    LeaveChat { chat_id: ChatId },
    /// Relay an already-persisted message to the chat's room.
    SendMessage { message: RelayMessage },
    /// Keep-alive ping. Server responds with `{"type":"pong"}`.
    Ping,
}

/// Message payload on the relay path.
///
/// The sender has already persisted the message over REST, so the gateway
/// does not re-authorize; it only fills in `created_at` and `is_read` when
/// the client omitted them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayMessage {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub sender_id: UserId,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_read: Option<bool>,
}

impl RelayMessage {
    /// Fill omitted fields with receive-side defaults.
    pub fn into_message(self, received_at: DateTime<Utc>) -> Message {
        Message {
            id: self.id,
            chat_id: self.chat_id,
            sender_id: self.sender_id,
            content: self.content,
            created_at: self.created_at.unwrap_or(received_at),
            is_read: self.is_read.unwrap_or(false),
        }
    }
}

/// Outbound event pushed to connected clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A message delivered to a chat room.
    ReceiveMessage { message: Message },
    /// Presence transition, broadcast to every connected session.
    UserStatus(UserStatus),
    /// Reply to a client ping.
    Pong,
}
