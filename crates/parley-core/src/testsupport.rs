//! In-memory fakes shared by unit tests in this crate.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use chrono::Utc;

use parley_types::chat::{Chat, ChatId};
use parley_types::error::{CacheError, RepositoryError};
use parley_types::message::{Message, MessageId};
use parley_types::user::{User, UserId};

use crate::cache::MessageCache;
use crate::chat::repository::{ChatCreation, ChatRepository, MessageInsert};
use crate::directory::UserDirectory;

#[derive(Default)]
struct RepoState {
    chats: Vec<(Chat, String)>,
    participants: HashMap<ChatId, HashSet<UserId>>,
    messages: Vec<Message>,
}

/// Mutex-backed fake of [`ChatRepository`].
#[derive(Default)]
pub(crate) struct MemoryChatRepository {
    state: Mutex<RepoState>,
}

impl MemoryChatRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message_ids(&self) -> Vec<MessageId> {
        self.state
            .lock()
            .unwrap()
            .messages
            .iter()
            .map(|m| m.id)
            .collect()
    }
}

impl ChatRepository for MemoryChatRepository {
    async fn find_by_participant_key(
        &self,
        participant_key: &str,
    ) -> Result<Option<Chat>, RepositoryError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .chats
            .iter()
            .find(|(_, key)| key == participant_key)
            .map(|(chat, _)| chat.clone()))
    }

    async fn create_chat(
        &self,
        is_group: bool,
        participant_key: &str,
        participants: &[UserId],
    ) -> Result<ChatCreation, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        if let Some((chat, _)) = state.chats.iter().find(|(_, key)| key == participant_key) {
            return Ok(ChatCreation::AlreadyExists(chat.clone()));
        }
        let chat = Chat {
            id: ChatId::new(),
            is_group,
            created_at: Utc::now(),
        };
        state
            .chats
            .push((chat.clone(), participant_key.to_string()));
        state
            .participants
            .insert(chat.id, participants.iter().copied().collect());
        Ok(ChatCreation::Created(chat))
    }

    async fn get_chat(&self, chat_id: &ChatId) -> Result<Option<Chat>, RepositoryError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .chats
            .iter()
            .find(|(chat, _)| chat.id == *chat_id)
            .map(|(chat, _)| chat.clone()))
    }

    async fn participants(&self, chat_id: &ChatId) -> Result<Vec<UserId>, RepositoryError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .participants
            .get(chat_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn is_participant(
        &self,
        chat_id: &ChatId,
        user_id: &UserId,
    ) -> Result<bool, RepositoryError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .participants
            .get(chat_id)
            .is_some_and(|set| set.contains(user_id)))
    }

    async fn insert_message(
        &self,
        chat_id: &ChatId,
        sender_id: &UserId,
        content: &str,
    ) -> Result<MessageInsert, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        let authorized = state
            .participants
            .get(chat_id)
            .is_some_and(|set| set.contains(sender_id));
        if !authorized {
            return Ok(MessageInsert::NotParticipant);
        }
        let message = Message {
            id: MessageId::new(),
            chat_id: *chat_id,
            sender_id: *sender_id,
            content: content.to_string(),
            created_at: Utc::now(),
            is_read: false,
        };
        state.messages.push(message.clone());
        Ok(MessageInsert::Inserted(message))
    }

    async fn recent_messages(
        &self,
        chat_id: &ChatId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>, RepositoryError> {
        let state = self.state.lock().unwrap();
        let mut messages: Vec<Message> = state
            .messages
            .iter()
            .filter(|m| m.chat_id == *chat_id)
            .cloned()
            .collect();
        messages.sort_by(|a, b| b.sort_key().cmp(&a.sort_key()));
        Ok(messages
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn message_count(&self, chat_id: &ChatId) -> Result<u64, RepositoryError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .messages
            .iter()
            .filter(|m| m.chat_id == *chat_id)
            .count() as u64)
    }
}

/// Fixed-population fake of [`UserDirectory`].
#[derive(Default)]
pub(crate) struct MemoryDirectory {
    users: HashMap<UserId, User>,
}

impl MemoryDirectory {
    pub fn with_users(ids: &[UserId]) -> Self {
        let users = ids
            .iter()
            .map(|id| {
                (
                    *id,
                    User {
                        id: *id,
                        username: format!("user-{id}"),
                        email: format!("{id}@example.com"),
                        created_at: Utc::now(),
                    },
                )
            })
            .collect();
        Self { users }
    }
}

impl UserDirectory for MemoryDirectory {
    async fn get_user(&self, user_id: &UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.get(user_id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.values().find(|u| u.email == email).cloned())
    }
}

/// Hash-map fake of [`MessageCache`] with miss/present-but-empty semantics.
#[derive(Default)]
pub(crate) struct MemoryCache {
    slots: Mutex<HashMap<ChatId, HashMap<MessageId, Message>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn evict(&self, chat_id: &ChatId) {
        self.slots.lock().unwrap().remove(chat_id);
    }

    pub fn cached_count(&self, chat_id: &ChatId) -> Option<usize> {
        self.slots.lock().unwrap().get(chat_id).map(|slot| slot.len())
    }
}

impl MessageCache for MemoryCache {
    async fn recent(&self, chat_id: &ChatId) -> Result<Option<Vec<Message>>, CacheError> {
        Ok(self
            .slots
            .lock()
            .unwrap()
            .get(chat_id)
            .map(|slot| slot.values().cloned().collect()))
    }

    async fn put(&self, chat_id: &ChatId, message: &Message) -> Result<(), CacheError> {
        self.slots
            .lock()
            .unwrap()
            .entry(*chat_id)
            .or_default()
            .insert(message.id, message.clone());
        Ok(())
    }

    async fn fill(&self, chat_id: &ChatId, messages: &[Message]) -> Result<(), CacheError> {
        let mut slots = self.slots.lock().unwrap();
        let slot = slots.entry(*chat_id).or_default();
        for message in messages {
            slot.insert(message.id, message.clone());
        }
        Ok(())
    }
}

/// Cache fake whose every call fails, for outage-path tests.
pub(crate) struct FailingCache;

impl MessageCache for FailingCache {
    async fn recent(&self, _chat_id: &ChatId) -> Result<Option<Vec<Message>>, CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    async fn put(&self, _chat_id: &ChatId, _message: &Message) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    async fn fill(&self, _chat_id: &ChatId, _messages: &[Message]) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }
}
