//! Bearer-token authentication extractor (the AuthGuard collaborator).
//!
//! Extracts and verifies tokens from:
//! - `Authorization: Bearer <token>` header
//! - `X-API-Key: <token>` header
//!
//! Tokens are SHA-256 hashed and compared against the `auth_tokens` table;
//! a match yields the verified user id. Everything downstream -- chat
//! resolution, message authorization -- trusts this id and nothing else from
//! the request.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sha2::{Digest, Sha256};
use sqlx::Row;
use uuid::Uuid;

use parley_types::user::UserId;

use crate::http::error::AppError;
use crate::state::AppState;

/// Authenticated request marker carrying the verified user id.
pub struct AuthUser(pub UserId);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Extract token from headers
        let token = extract_token(parts)?;

        // Hash the provided token
        let token_hash = hash_token(&token);

        // Verify against database
        let result = sqlx::query("SELECT id, user_id FROM auth_tokens WHERE token_hash = ?")
            .bind(&token_hash)
            .fetch_optional(&state.db_pool.reader)
            .await
            .map_err(|e| AppError::Internal(format!("Database error: {e}")))?;

        match result {
            Some(row) => {
                let raw_user: String = row.get("user_id");
                let user_id = Uuid::parse_str(&raw_user)
                    .map_err(|e| AppError::Internal(format!("Corrupt token row: {e}")))?;

                // Update last_used_at (best effort, don't fail the request)
                let id: String = row.get("id");
                let now = chrono::Utc::now().to_rfc3339();
                let _ = sqlx::query("UPDATE auth_tokens SET last_used_at = ? WHERE id = ?")
                    .bind(&now)
                    .bind(&id)
                    .execute(&state.db_pool.writer)
                    .await;

                Ok(AuthUser(UserId::from_uuid(user_id)))
            }
            None => Err(AppError::Unauthorized(
                "Invalid token. Provide a valid token via 'Authorization: Bearer <token>' or 'X-API-Key: <token>' header.".to_string(),
            )),
        }
    }
}

/// Extract the bearer token from request headers.
fn extract_token(parts: &Parts) -> Result<String, AppError> {
    // Try Authorization: Bearer <token>
    if let Some(auth) = parts.headers.get("authorization") {
        let auth_str = auth.to_str().map_err(|_| {
            AppError::Unauthorized("Invalid Authorization header encoding".to_string())
        })?;
        if let Some(token) = auth_str.strip_prefix("Bearer ") {
            return Ok(token.trim().to_string());
        }
    }

    // Try X-API-Key header
    if let Some(token) = parts.headers.get("x-api-key") {
        let token_str = token.to_str().map_err(|_| {
            AppError::Unauthorized("Invalid X-API-Key header encoding".to_string())
        })?;
        return Ok(token_str.trim().to_string());
    }

    Err(AppError::Unauthorized(
        "Missing token. Provide via 'Authorization: Bearer <token>' or 'X-API-Key: <token>' header.".to_string(),
    ))
}

/// Compute SHA-256 hash of a token (lowercase hex).
pub fn hash_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    format!("{:x}", digest)
}

/// Generate a fresh opaque bearer token.
///
/// The plaintext is shown to the operator once; only its hash is stored.
pub fn generate_token() -> String {
    use aes_gcm::aead::{rand_core::RngCore, OsRng};
    let mut token_bytes = [0u8; 32];
    OsRng.fill_bytes(&mut token_bytes);
    format!(
        "parley_{}",
        token_bytes.iter().map(|b| format!("{b:02x}")).collect::<String>()
    )
}
