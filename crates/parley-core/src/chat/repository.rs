//! ChatRepository trait definition.
//!
//! Persistence port for chats, participants, and messages. Implementations
//! live in parley-infra (e.g., `SqliteChatRepository`) and must run every
//! check-then-mutate sequence (`create_chat`, `insert_message`) inside one
//! database transaction. Uses native async fn in traits (RPITIT, Rust 2024
//! edition).

use parley_types::chat::{Chat, ChatId};
use parley_types::error::RepositoryError;
use parley_types::message::Message;
use parley_types::user::UserId;

/// Outcome of a chat creation attempt.
#[derive(Debug, Clone)]
pub enum ChatCreation {
    /// The chat was created by this call.
    Created(Chat),
    /// A concurrent call created the same participant set first; this is the
    /// winner's chat. Never surfaced to callers as an error.
    AlreadyExists(Chat),
}

/// Outcome of an authorized message insert.
#[derive(Debug, Clone)]
pub enum MessageInsert {
    /// The sender was a participant and the message committed.
    Inserted(Message),
    /// The sender was not a participant; nothing was written.
    NotParticipant,
}

/// Repository trait for chat and message persistence.
pub trait ChatRepository: Send + Sync {
    /// Look up a chat by its participant-set fingerprint.
    fn find_by_participant_key(
        &self,
        participant_key: &str,
    ) -> impl std::future::Future<Output = Result<Option<Chat>, RepositoryError>> + Send;

    /// Create a chat plus its participant rows in one transaction.
    ///
    /// A UNIQUE violation on the fingerprint means a concurrent call won the
    /// creation race: the implementation must roll back, re-read, and return
    /// [`ChatCreation::AlreadyExists`] with the winner's chat.
    fn create_chat(
        &self,
        is_group: bool,
        participant_key: &str,
        participants: &[UserId],
    ) -> impl std::future::Future<Output = Result<ChatCreation, RepositoryError>> + Send;

    /// Get a chat by id.
    fn get_chat(
        &self,
        chat_id: &ChatId,
    ) -> impl std::future::Future<Output = Result<Option<Chat>, RepositoryError>> + Send;

    /// List the participant ids of a chat.
    fn participants(
        &self,
        chat_id: &ChatId,
    ) -> impl std::future::Future<Output = Result<Vec<UserId>, RepositoryError>> + Send;

    /// Whether a user is a participant of a chat.
    fn is_participant(
        &self,
        chat_id: &ChatId,
        user_id: &UserId,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Insert a message after verifying the sender's membership, both inside
    /// one transaction. Returns the committed message with server-assigned
    /// id and timestamp, or [`MessageInsert::NotParticipant`] with no row
    /// written.
    fn insert_message(
        &self,
        chat_id: &ChatId,
        sender_id: &UserId,
        content: &str,
    ) -> impl std::future::Future<Output = Result<MessageInsert, RepositoryError>> + Send;

    /// Fetch messages for a chat ordered newest first, windowed by
    /// limit/offset.
    fn recent_messages(
        &self,
        chat_id: &ChatId,
        limit: i64,
        offset: i64,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, RepositoryError>> + Send;

    /// Count messages in a chat.
    fn message_count(
        &self,
        chat_id: &ChatId,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}
