//! Chat resolver: idempotent find-or-create per exact participant set.
//!
//! Resolution is keyed by the participant-set fingerprint. Concurrent calls
//! for the same set may both miss the fast-path lookup; the repository's
//! UNIQUE constraint then lets exactly one create succeed and the loser is
//! handed the winner's chat. Callers never observe the race.

use tracing::info;

use parley_types::chat::ResolvedChat;
use parley_types::error::ChatError;
use parley_types::user::UserId;

use crate::chat::fingerprint::participant_key;
use crate::chat::repository::{ChatCreation, ChatRepository};
use crate::directory::UserDirectory;

/// Resolves participant sets to their unique chat, creating on first use.
///
/// Generic over `ChatRepository` and `UserDirectory` to maintain clean
/// architecture (parley-core never depends on parley-infra).
pub struct ChatResolver<R: ChatRepository, D: UserDirectory> {
    repo: R,
    directory: D,
}

impl<R: ChatRepository, D: UserDirectory> ChatResolver<R, D> {
    /// Create a new resolver with the given repository and directory.
    pub fn new(repo: R, directory: D) -> Self {
        Self { repo, directory }
    }

    /// Access the chat repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Resolve the unique one-to-one chat for `{requester, other}`.
    ///
    /// Creates the chat plus both participant rows in one transaction when no
    /// chat exists for that exact pair.
    pub async fn resolve_individual(
        &self,
        requester: UserId,
        other: UserId,
    ) -> Result<ResolvedChat, ChatError> {
        if other == requester {
            return Err(ChatError::SelfChat);
        }
        self.require_user(&other).await?;

        let members = [requester, other];
        let key = participant_key(&members);
        self.resolve(false, &key, &members).await
    }

    /// Resolve the unique group chat for `{requester} ∪ others`.
    ///
    /// Exact set equality, not overlap, determines a match. Duplicate ids in
    /// `others` are collapsed before resolution.
    pub async fn resolve_group(
        &self,
        requester: UserId,
        others: &[UserId],
    ) -> Result<ResolvedChat, ChatError> {
        if others.is_empty() {
            return Err(ChatError::InvalidParticipants(
                "receiver list is empty".to_string(),
            ));
        }
        if others.contains(&requester) {
            return Err(ChatError::InvalidParticipants(
                "receiver list contains the requester".to_string(),
            ));
        }

        let mut members: Vec<UserId> = others.to_vec();
        members.sort();
        members.dedup();
        if members.len() < 2 {
            return Err(ChatError::InvalidParticipants(
                "a group chat needs at least two other participants".to_string(),
            ));
        }
        for other in &members {
            self.require_user(other).await?;
        }
        members.push(requester);

        let key = participant_key(&members);
        self.resolve(true, &key, &members).await
    }

    async fn resolve(
        &self,
        is_group: bool,
        key: &str,
        members: &[UserId],
    ) -> Result<ResolvedChat, ChatError> {
        // Fast path: the set already has its chat.
        if let Some(chat) = self.repo.find_by_participant_key(key).await? {
            return Ok(ResolvedChat {
                chat,
                existing: true,
            });
        }

        match self.repo.create_chat(is_group, key, members).await? {
            ChatCreation::Created(chat) => {
                info!(chat_id = %chat.id, is_group, "chat created");
                Ok(ResolvedChat {
                    chat,
                    existing: false,
                })
            }
            ChatCreation::AlreadyExists(chat) => Ok(ResolvedChat {
                chat,
                existing: true,
            }),
        }
    }

    async fn require_user(&self, user_id: &UserId) -> Result<(), ChatError> {
        match self.directory.get_user(user_id).await? {
            Some(_) => Ok(()),
            None => Err(ChatError::UserNotFound),
        }
    }
}
