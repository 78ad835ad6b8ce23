//! Message service: authorize, persist transactionally, cache, broadcast.
//!
//! `send` is the only chat-mutating path: the repository checks membership
//! and inserts inside one transaction, then the cache write and the room
//! broadcast run fire-and-forget -- neither can fail or delay a committed
//! persistence. `history` is cache-aside: serve the slot when present, else
//! read the store and backfill.

use std::sync::Arc;

use tracing::{debug, warn};

use parley_types::chat::ChatId;
use parley_types::error::MessageError;
use parley_types::event::ServerEvent;
use parley_types::message::Message;
use parley_types::user::UserId;

use crate::cache::MessageCache;
use crate::chat::repository::{ChatRepository, MessageInsert};
use crate::realtime::RoomBus;

/// Orchestrates message persistence, cache population, and live delivery.
///
/// Generic over `ChatRepository` and `MessageCache` to maintain clean
/// architecture (parley-core never depends on parley-infra).
pub struct MessageService<R: ChatRepository, C: MessageCache> {
    repo: R,
    cache: C,
    rooms: Arc<RoomBus>,
}

impl<R: ChatRepository, C: MessageCache> MessageService<R, C> {
    /// Create a new message service over the given repository, cache, and
    /// room bus.
    pub fn new(repo: R, cache: C, rooms: Arc<RoomBus>) -> Self {
        Self { repo, cache, rooms }
    }

    /// Access the chat repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Persist a message and deliver it to the chat's room.
    ///
    /// Fails `EmptyContent` before any I/O when the trimmed content is empty,
    /// and `NotParticipant` (with no row written) when the sender is not a
    /// member of the chat. On success returns the canonical message with
    /// server-assigned id and timestamp.
    pub async fn send(
        &self,
        sender_id: UserId,
        chat_id: ChatId,
        content: &str,
    ) -> Result<Message, MessageError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(MessageError::EmptyContent);
        }

        let message = match self.repo.insert_message(&chat_id, &sender_id, content).await? {
            MessageInsert::Inserted(message) => message,
            MessageInsert::NotParticipant => return Err(MessageError::NotParticipant),
        };

        // Committed from here on: cache and broadcast must not undo or fail it.
        if let Err(err) = self.cache.put(&chat_id, &message).await {
            warn!(chat_id = %chat_id, error = %err, "cache write failed after commit; message remains durable");
        }
        let reached = self.rooms.publish(
            &chat_id,
            ServerEvent::ReceiveMessage {
                message: message.clone(),
            },
        );
        debug!(chat_id = %chat_id, message_id = %message.id, reached, "message broadcast");

        Ok(message)
    }

    /// Fetch a chat's messages newest first, windowed by limit/offset.
    ///
    /// Serves from the cache when its slot is present (including the
    /// present-but-empty marker); otherwise reads the store and backfills the
    /// fetched window. Cache failures on either path degrade to a store read.
    pub async fn history(
        &self,
        requester_id: UserId,
        chat_id: ChatId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>, MessageError> {
        if !self.repo.is_participant(&chat_id, &requester_id).await? {
            return Err(MessageError::NotParticipant);
        }

        let limit = limit.max(0);
        let offset = offset.max(0);

        match self.cache.recent(&chat_id).await {
            Ok(Some(mut cached)) => {
                cached.sort_by(|a, b| b.sort_key().cmp(&a.sort_key()));
                return Ok(cached
                    .into_iter()
                    .skip(offset as usize)
                    .take(limit as usize)
                    .collect());
            }
            Ok(None) => {}
            Err(err) => {
                warn!(chat_id = %chat_id, error = %err, "cache read failed; falling back to store");
            }
        }

        let fetched = self.repo.recent_messages(&chat_id, limit, offset).await?;

        // Backfill the window. An empty first page marks the slot
        // present-but-empty; an empty later page proves nothing about the
        // chat and is not written back.
        if !fetched.is_empty() || offset == 0 {
            if let Err(err) = self.cache.fill(&chat_id, &fetched).await {
                warn!(chat_id = %chat_id, error = %err, "cache backfill failed; continuing without cache");
            }
        }

        Ok(fetched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::fingerprint::participant_key;
    use crate::chat::repository::ChatCreation;
    use crate::testsupport::{FailingCache, MemoryCache, MemoryChatRepository};

    async fn chat_with_members(repo: &MemoryChatRepository, members: &[UserId]) -> ChatId {
        match repo
            .create_chat(members.len() > 2, &participant_key(members), members)
            .await
            .unwrap()
        {
            ChatCreation::Created(chat) => chat.id,
            ChatCreation::AlreadyExists(chat) => chat.id,
        }
    }

    fn service(
        repo: MemoryChatRepository,
        cache: MemoryCache,
    ) -> MessageService<MemoryChatRepository, MemoryCache> {
        MessageService::new(repo, cache, Arc::new(RoomBus::new(16)))
    }

    #[tokio::test]
    async fn send_assigns_id_and_timestamp_and_trims() {
        let repo = MemoryChatRepository::new();
        let (a, b) = (UserId::new(), UserId::new());
        let chat_id = chat_with_members(&repo, &[a, b]).await;
        let svc = service(repo, MemoryCache::new());

        let message = svc.send(a, chat_id, "  hi there  ").await.unwrap();
        assert_eq!(message.content, "hi there");
        assert_eq!(message.sender_id, a);
        assert_eq!(message.chat_id, chat_id);
        assert!(!message.is_read);
    }

    #[tokio::test]
    async fn send_rejects_blank_content_before_io() {
        let repo = MemoryChatRepository::new();
        let (a, b) = (UserId::new(), UserId::new());
        let chat_id = chat_with_members(&repo, &[a, b]).await;
        let svc = service(repo, MemoryCache::new());

        let err = svc.send(a, chat_id, "   \n\t  ").await.unwrap_err();
        assert!(matches!(err, MessageError::EmptyContent));
        assert!(svc.repo().message_ids().is_empty());
    }

    #[tokio::test]
    async fn send_by_outsider_persists_nothing_and_broadcasts_nothing() {
        let repo = MemoryChatRepository::new();
        let (a, b) = (UserId::new(), UserId::new());
        let outsider = UserId::new();
        let chat_id = chat_with_members(&repo, &[a, b]).await;
        let rooms = Arc::new(RoomBus::new(16));
        let svc = MessageService::new(repo, MemoryCache::new(), rooms.clone());
        let mut rx = rooms.join(chat_id);

        let err = svc.send(outsider, chat_id, "sneaky").await.unwrap_err();
        assert!(matches!(err, MessageError::NotParticipant));
        assert!(svc.repo().message_ids().is_empty());
        assert!(matches!(
            rx.try_recv(),
            Err(tokio::sync::broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn send_reaches_joined_room_members() {
        let repo = MemoryChatRepository::new();
        let (a, b) = (UserId::new(), UserId::new());
        let chat_id = chat_with_members(&repo, &[a, b]).await;
        let rooms = Arc::new(RoomBus::new(16));
        let svc = MessageService::new(repo, MemoryCache::new(), rooms.clone());
        let mut rx = rooms.join(chat_id);

        let sent = svc.send(a, chat_id, "hi").await.unwrap();
        match rx.recv().await.unwrap() {
            ServerEvent::ReceiveMessage { message } => assert_eq!(message, sent),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn cache_outage_never_fails_a_send() {
        let repo = MemoryChatRepository::new();
        let (a, b) = (UserId::new(), UserId::new());
        let chat_id = chat_with_members(&repo, &[a, b]).await;
        let rooms = Arc::new(RoomBus::new(16));
        let svc = MessageService::new(repo, FailingCache, rooms.clone());
        let mut rx = rooms.join(chat_id);

        let sent = svc.send(a, chat_id, "hi").await.unwrap();
        assert_eq!(svc.repo().message_ids(), vec![sent.id]);
        // Broadcast still happens after the failed cache write.
        assert!(rx.recv().await.is_ok());

        // And history degrades to the store.
        let history = svc.history(b, chat_id, 10, 0).await.unwrap();
        assert_eq!(history, vec![sent]);
    }

    #[tokio::test]
    async fn history_requires_membership() {
        let repo = MemoryChatRepository::new();
        let (a, b) = (UserId::new(), UserId::new());
        let chat_id = chat_with_members(&repo, &[a, b]).await;
        let svc = service(repo, MemoryCache::new());

        let err = svc.history(UserId::new(), chat_id, 10, 0).await.unwrap_err();
        assert!(matches!(err, MessageError::NotParticipant));
    }

    #[tokio::test]
    async fn history_serves_cache_and_store_identically() {
        let repo = MemoryChatRepository::new();
        let (a, b) = (UserId::new(), UserId::new());
        let chat_id = chat_with_members(&repo, &[a, b]).await;
        let svc = service(repo, MemoryCache::new());

        for i in 0..5 {
            svc.send(a, chat_id, &format!("message {i}")).await.unwrap();
        }

        // Sends populated the cache; this is the cached view.
        let from_cache = svc.history(b, chat_id, 10, 0).await.unwrap();
        assert_eq!(from_cache.len(), 5);
        assert_eq!(from_cache[0].content, "message 4");

        // Drop the slot and read again: the store view must match exactly.
        svc.cache.evict(&chat_id);
        let from_store = svc.history(b, chat_id, 10, 0).await.unwrap();
        assert_eq!(from_store, from_cache);
    }

    #[tokio::test]
    async fn history_miss_backfills_the_fetched_window() {
        let repo = MemoryChatRepository::new();
        let (a, b) = (UserId::new(), UserId::new());
        let chat_id = chat_with_members(&repo, &[a, b]).await;
        let svc = service(repo, MemoryCache::new());

        for i in 0..4 {
            svc.send(a, chat_id, &format!("message {i}")).await.unwrap();
        }
        svc.cache.evict(&chat_id);

        let window = svc.history(b, chat_id, 2, 0).await.unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(svc.cache.cached_count(&chat_id), Some(2));
    }

    #[tokio::test]
    async fn history_windows_by_limit_and_offset() {
        let repo = MemoryChatRepository::new();
        let (a, b) = (UserId::new(), UserId::new());
        let chat_id = chat_with_members(&repo, &[a, b]).await;
        let svc = service(repo, MemoryCache::new());

        for i in 0..6 {
            svc.send(a, chat_id, &format!("message {i}")).await.unwrap();
        }

        let page = svc.history(b, chat_id, 2, 2).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].content, "message 3");
        assert_eq!(page[1].content, "message 2");
    }

    #[tokio::test]
    async fn empty_chat_gets_a_present_but_empty_slot() {
        let repo = MemoryChatRepository::new();
        let (a, b) = (UserId::new(), UserId::new());
        let chat_id = chat_with_members(&repo, &[a, b]).await;
        let svc = service(repo, MemoryCache::new());

        assert_eq!(svc.cache.cached_count(&chat_id), None);
        let history = svc.history(b, chat_id, 10, 0).await.unwrap();
        assert!(history.is_empty());
        // The slot now exists (empty), so the next call is a cache hit.
        assert_eq!(svc.cache.cached_count(&chat_id), Some(0));
    }

    #[tokio::test]
    async fn empty_later_page_is_not_written_back() {
        let repo = MemoryChatRepository::new();
        let (a, b) = (UserId::new(), UserId::new());
        let chat_id = chat_with_members(&repo, &[a, b]).await;
        let svc = service(repo, MemoryCache::new());

        svc.send(a, chat_id, "only one").await.unwrap();
        svc.cache.evict(&chat_id);

        let page = svc.history(b, chat_id, 10, 5).await.unwrap();
        assert!(page.is_empty());
        // An empty off-the-end page must not masquerade as an empty chat.
        assert_eq!(svc.cache.cached_count(&chat_id), None);
    }
}
