//! MessageCache trait definition.
//!
//! Cache-aside port for recent messages, keyed by chat. The cache is never
//! authoritative: every caller must tolerate a miss (and a failure, which is
//! treated as a miss) by falling back to the repository. Losing cached
//! content after a commit is acceptable; the message itself stays durable.
//!
//! A present-but-empty slot is distinct from a miss so that legitimately
//! empty chats do not trigger a store read on every history call.

use parley_types::chat::ChatId;
use parley_types::error::CacheError;
use parley_types::message::Message;

/// Cache-aside store of recent messages per chat.
pub trait MessageCache: Send + Sync {
    /// All cached messages for a chat, in no particular order.
    ///
    /// `None` is a miss (absent or expired slot); `Some(vec![])` is a
    /// present-but-empty slot written by [`MessageCache::fill`] with an empty
    /// window.
    fn recent(
        &self,
        chat_id: &ChatId,
    ) -> impl std::future::Future<Output = Result<Option<Vec<Message>>, CacheError>> + Send;

    /// Add one message to a chat's slot, refreshing its expiry.
    ///
    /// Message content is immutable, so concurrent puts of the same id are
    /// last-writer-wins and harmless.
    fn put(
        &self,
        chat_id: &ChatId,
        message: &Message,
    ) -> impl std::future::Future<Output = Result<(), CacheError>> + Send;

    /// Backfill a fetched window into a chat's slot, refreshing its expiry.
    ///
    /// An empty slice marks the slot present-but-empty.
    fn fill(
        &self,
        chat_id: &ChatId,
        messages: &[Message],
    ) -> impl std::future::Future<Output = Result<(), CacheError>> + Send;
}
