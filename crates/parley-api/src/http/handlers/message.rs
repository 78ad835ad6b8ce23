//! Message send and history handlers.
//!
//! Endpoints:
//! - POST /api/v1/chats/{chat_id}/messages - Send a message (201 on success)
//! - GET  /api/v1/chats/{chat_id}/messages - History, newest first

use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use parley_types::chat::ChatId;

use crate::http::error::AppError;
use crate::http::extractors::auth::AuthUser;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Request body for sending a message.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

/// Query parameters for history listing.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// Parse a chat id from a path parameter, returning a 400 error on invalid format.
fn parse_chat_id(s: &str) -> Result<ChatId, AppError> {
    s.parse::<Uuid>()
        .map(ChatId::from_uuid)
        .map_err(|_| AppError::Validation(format!("Invalid chat id: {s}")))
}

/// POST /api/v1/chats/{chat_id}/messages - Persist and broadcast a message.
pub async fn send_message(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(chat_id): Path<String>,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<ApiResponse<serde_json::Value>>), AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let chat_id = parse_chat_id(&chat_id)?;
    let message = state
        .message_service
        .send(user_id, chat_id, &body.content)
        .await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let message_json = serde_json::to_value(&message)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let resp = ApiResponse::success(message_json, request_id, elapsed)
        .with_link("history", &format!("/api/v1/chats/{chat_id}/messages"));

    Ok((StatusCode::CREATED, Json(resp)))
}

/// GET /api/v1/chats/{chat_id}/messages - Fetch history, newest first.
pub async fn get_history(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(chat_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<Vec<serde_json::Value>>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let chat_id = parse_chat_id(&chat_id)?;
    let messages = state
        .message_service
        .history(user_id, chat_id, query.limit, query.offset)
        .await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let messages_json = messages
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let resp = ApiResponse::success(messages_json, request_id, elapsed)
        .with_link("self", &format!("/api/v1/chats/{chat_id}/messages"));

    Ok(Json(resp))
}
