//! Chat and participant types.
//!
//! A chat owns a fixed participant set and an append-only message sequence.
//! Chats are created exclusively by the resolver (find-or-create per exact
//! participant set) and are never deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::user::UserId;

/// Unique identifier for a chat, wrapping a UUID v7 (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChatId(pub Uuid);

impl ChatId {
    /// Create a new ChatId using UUID v7.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create a ChatId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ChatId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChatId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A conversation between two users (`is_group = false`) or more.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    pub is_group: bool,
    pub created_at: DateTime<Utc>,
}

/// Membership link granting send/read authorization on a chat.
///
/// Unique per `(chat_id, user_id)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub chat_id: ChatId,
    pub user_id: UserId,
}

/// Result of resolving a participant set to its chat.
///
/// `existing` is true when the chat already existed, including when a
/// concurrent creation race was lost and the winner's chat was returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedChat {
    pub chat: Chat,
    pub existing: bool,
}
