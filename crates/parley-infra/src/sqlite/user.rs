//! SQLite user directory implementation plus admin provisioning helpers.
//!
//! Implements `UserDirectory` from `parley-core`. Account creation and token
//! issuance are inherent methods consumed by the admin CLI only; the chat
//! core sees users exclusively through the directory trait.

use parley_core::directory::UserDirectory;
use parley_types::error::RepositoryError;
use parley_types::user::{User, UserId};

use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `UserDirectory`.
pub struct SqliteUserDirectory {
    pool: DatabasePool,
}

impl SqliteUserDirectory {
    /// Create a new directory backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Create a user account. Admin CLI only.
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
    ) -> Result<User, RepositoryError> {
        let user = User {
            id: UserId::new(),
            username: username.to_string(),
            email: email.to_string(),
            created_at: Utc::now(),
        };

        let result = sqlx::query(
            "INSERT INTO users (id, username, email, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(&user.email)
        .bind(format_datetime(&user.created_at))
        .execute(&self.pool.writer)
        .await;

        match result {
            Ok(_) => Ok(user),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(
                RepositoryError::Conflict(format!("username or email already taken: {username}")),
            ),
            Err(e) => Err(RepositoryError::Query(e.to_string())),
        }
    }

    /// List all users, newest first. Admin CLI only.
    pub async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, username, email, created_at FROM users ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut users = Vec::with_capacity(rows.len());
        for row in &rows {
            users.push(user_from_row(row)?);
        }
        Ok(users)
    }

    /// Get a user by username. Admin CLI only.
    pub async fn get_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query("SELECT id, username, email, created_at FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// Store the hash of a freshly issued bearer token for a user.
    ///
    /// The plaintext token is never stored; the caller shows it once.
    pub async fn store_token_hash(
        &self,
        user_id: &UserId,
        token_hash: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO auth_tokens (id, user_id, token_hash, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(Uuid::now_v7().to_string())
        .bind(user_id.to_string())
        .bind(token_hash)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }
}

fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<User, RepositoryError> {
    let raw_id: String = row
        .try_get("id")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let id = Uuid::parse_str(&raw_id)
        .map_err(|e| RepositoryError::Query(format!("invalid user id: {e}")))?;
    let username: String = row
        .try_get("username")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let email: String = row
        .try_get("email")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let raw_created: String = row
        .try_get("created_at")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let created_at = parse_datetime(&raw_created)?;

    Ok(User {
        id: UserId::from_uuid(id),
        username,
        email,
        created_at,
    })
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

impl UserDirectory for SqliteUserDirectory {
    async fn get_user(&self, user_id: &UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query("SELECT id, username, email, created_at FROM users WHERE id = ?")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query("SELECT id, username, email, created_at FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.as_ref().map(user_from_row).transpose()
    }
}
