use thiserror::Error;

/// Errors from chat resolution.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("cannot start a chat with yourself")]
    SelfChat,

    #[error("invalid participant set: {0}")]
    InvalidParticipants(String),

    #[error("user not found")]
    UserNotFound,

    #[error("chat not found")]
    NotFound,

    #[error("storage error: {0}")]
    Storage(String),
}

/// Errors from message operations.
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("message content must not be empty")]
    EmptyContent,

    #[error("sender is not a participant of this chat")]
    NotParticipant,

    #[error("chat not found")]
    ChatNotFound,

    #[error("storage error: {0}")]
    Storage(String),
}

/// Errors from the recent-message cache.
///
/// Always swallowed by callers: every read path falls back to the store and
/// every write path treats the cache as fire-and-forget.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    #[error("cache serialization error: {0}")]
    Serialization(String),
}

/// Errors from repository operations (used by trait definitions in parley-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<RepositoryError> for ChatError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => ChatError::NotFound,
            other => ChatError::Storage(other.to_string()),
        }
    }
}

impl From<RepositoryError> for MessageError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => MessageError::ChatNotFound,
            other => MessageError::Storage(other.to_string()),
        }
    }
}
