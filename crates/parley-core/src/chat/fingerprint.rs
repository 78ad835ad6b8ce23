//! Participant-set fingerprints.
//!
//! A chat's identity is its exact participant set. The fingerprint is the
//! sorted, deduplicated participant ids joined with `:` -- injective per set,
//! insensitive to caller ordering, and readable in the database. A UNIQUE
//! constraint on the fingerprint column is what makes concurrent
//! resolve-or-create calls converge on a single chat.

use parley_types::user::UserId;

/// Compute the canonical fingerprint for a participant set.
pub fn participant_key(participants: &[UserId]) -> String {
    let mut ids: Vec<UserId> = participants.to_vec();
    ids.sort();
    ids.dedup();
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(":")
}
