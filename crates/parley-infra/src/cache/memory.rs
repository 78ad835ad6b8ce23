//! In-memory TTL cache of recent messages, keyed by chat.
//!
//! Each chat's slot holds a mapping of message id to the JSON-serialized
//! message, mirroring a Redis hash, plus an expiry instant. Expiry is lazy
//! (checked on read, no background sweeper) and refreshed on every write to
//! the slot. Slots are additionally capped at a fixed number of entries per
//! chat, evicting the oldest message ids first; without the cap a busy chat's
//! slot would grow for the whole TTL window.
//!
//! Never authoritative: a lost or expired slot just means the next history
//! call reads the store and backfills.

use std::collections::HashMap;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use parley_core::cache::MessageCache;
use parley_types::chat::ChatId;
use parley_types::error::CacheError;
use parley_types::message::{Message, MessageId};

/// Slot TTL matching the original deployment's hours-scale expiry.
const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60 * 60);

/// Hard cap on cached messages per chat.
const DEFAULT_MAX_ENTRIES: usize = 256;

struct Slot {
    entries: HashMap<MessageId, String>,
    expires_at: Instant,
}

/// In-memory implementation of `MessageCache`.
pub struct InMemoryMessageCache {
    slots: DashMap<ChatId, Slot>,
    ttl: Duration,
    max_entries: usize,
}

impl InMemoryMessageCache {
    /// Create a cache with the default TTL and per-chat entry cap.
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_TTL, DEFAULT_MAX_ENTRIES)
    }

    /// Create a cache with explicit TTL and per-chat entry cap.
    pub fn with_limits(ttl: Duration, max_entries: usize) -> Self {
        Self {
            slots: DashMap::new(),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    /// Number of chats with a live slot.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    fn insert_capped(&self, slot: &mut Slot, message: &Message) -> Result<(), CacheError> {
        let serialized = serde_json::to_string(message)
            .map_err(|e| CacheError::Serialization(e.to_string()))?;
        slot.entries.insert(message.id, serialized);

        // Message ids are UUID v7, so the smallest id is the oldest message.
        while slot.entries.len() > self.max_entries {
            let oldest = slot.entries.keys().min().copied();
            match oldest {
                Some(id) => slot.entries.remove(&id),
                None => break,
            };
        }
        Ok(())
    }
}

impl Default for InMemoryMessageCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageCache for InMemoryMessageCache {
    async fn recent(&self, chat_id: &ChatId) -> Result<Option<Vec<Message>>, CacheError> {
        let expired = match self.slots.get(chat_id) {
            Some(slot) => {
                if Instant::now() < slot.expires_at {
                    let mut messages = Vec::with_capacity(slot.entries.len());
                    for serialized in slot.entries.values() {
                        let message: Message = serde_json::from_str(serialized)
                            .map_err(|e| CacheError::Serialization(e.to_string()))?;
                        messages.push(message);
                    }
                    return Ok(Some(messages));
                }
                true
            }
            None => false,
        };

        if expired {
            // Lazy expiry: drop the stale slot so it reads as a miss.
            self.slots
                .remove_if(chat_id, |_, slot| Instant::now() >= slot.expires_at);
        }
        Ok(None)
    }

    async fn put(&self, chat_id: &ChatId, message: &Message) -> Result<(), CacheError> {
        let mut slot = self.slots.entry(*chat_id).or_insert_with(|| Slot {
            entries: HashMap::new(),
            expires_at: Instant::now() + self.ttl,
        });
        slot.expires_at = Instant::now() + self.ttl;
        self.insert_capped(&mut slot, message)
    }

    async fn fill(&self, chat_id: &ChatId, messages: &[Message]) -> Result<(), CacheError> {
        let mut slot = self.slots.entry(*chat_id).or_insert_with(|| Slot {
            entries: HashMap::new(),
            expires_at: Instant::now() + self.ttl,
        });
        slot.expires_at = Instant::now() + self.ttl;
        for message in messages {
            self.insert_capped(&mut slot, message)?;
        }
        Ok(())
    }
}
