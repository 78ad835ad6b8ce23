//! Chat resolution handlers.
//!
//! Endpoints:
//! - POST /api/v1/chats/individual - Find or create the one-to-one chat
//! - POST /api/v1/chats/group      - Find or create a group chat

use std::time::Instant;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use parley_types::user::UserId;

use crate::http::error::AppError;
use crate::http::extractors::auth::AuthUser;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Request body for starting a one-to-one chat.
#[derive(Debug, Deserialize)]
pub struct StartIndividualRequest {
    pub receiver_id: UserId,
}

/// Request body for starting a group chat.
#[derive(Debug, Deserialize)]
pub struct StartGroupRequest {
    pub receiver_ids: Vec<UserId>,
}

/// POST /api/v1/chats/individual - Resolve the chat for `{caller, receiver}`.
pub async fn start_individual(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<StartIndividualRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let resolved = state
        .chat_resolver
        .resolve_individual(user_id, body.receiver_id)
        .await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let data = serde_json::json!({
        "chat_id": resolved.chat.id,
        "existing": resolved.existing,
    });
    let resp = ApiResponse::success(data, request_id, elapsed)
        .with_link("messages", &format!("/api/v1/chats/{}/messages", resolved.chat.id));

    Ok(Json(resp))
}

/// POST /api/v1/chats/group - Resolve the chat for `{caller} ∪ receivers`.
pub async fn start_group(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<StartGroupRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let resolved = state
        .chat_resolver
        .resolve_group(user_id, &body.receiver_ids)
        .await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let data = serde_json::json!({
        "chat_id": resolved.chat.id,
        "existing": resolved.existing,
    });
    let resp = ApiResponse::success(data, request_id, elapsed)
        .with_link("messages", &format!("/api/v1/chats/{}/messages", resolved.chat.id));

    Ok(Json(resp))
}
