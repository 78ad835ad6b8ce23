//! UserDirectory trait definition.
//!
//! Lookup port for user records. Accounts are provisioned externally; the
//! chat core only resolves references through this trait.

use parley_types::error::RepositoryError;
use parley_types::user::{User, UserId};

/// Read-only user lookup collaborator.
pub trait UserDirectory: Send + Sync {
    /// Get a user by id.
    fn get_user(
        &self,
        user_id: &UserId,
    ) -> impl std::future::Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// Get a user by email.
    fn get_user_by_email(
        &self,
        email: &str,
    ) -> impl std::future::Future<Output = Result<Option<User>, RepositoryError>> + Send;
}
