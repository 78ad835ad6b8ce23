//! Application error type mapping to HTTP status codes and envelope format.
//!
//! Taxonomy: validation errors reject before any I/O with 400; authorization
//! failures (not a participant) are 403 with no partial mutation; unknown
//! users/chats are 404; storage failures surface as a generic retryable 500.
//! Cache failures never reach this type -- they are swallowed upstream.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use parley_types::error::{ChatError, MessageError};

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Chat resolution errors.
    Chat(ChatError),
    /// Message send/history errors.
    Message(MessageError),
    /// Authentication failure.
    Unauthorized(String),
    /// Validation error.
    Validation(String),
    /// Generic internal error.
    Internal(String),
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        AppError::Chat(e)
    }
}

impl From<MessageError> for AppError {
    fn from(e: MessageError) -> Self {
        AppError::Message(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Chat(ChatError::SelfChat) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "Cannot start a chat with yourself".to_string(),
            ),
            AppError::Chat(ChatError::InvalidParticipants(msg)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Chat(ChatError::UserNotFound) => (
                StatusCode::NOT_FOUND,
                "USER_NOT_FOUND",
                "User not found".to_string(),
            ),
            AppError::Chat(ChatError::NotFound) => (
                StatusCode::NOT_FOUND,
                "CHAT_NOT_FOUND",
                "Chat not found".to_string(),
            ),
            AppError::Chat(ChatError::Storage(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORAGE_ERROR",
                "Storage temporarily unavailable, please retry".to_string(),
            ),
            AppError::Message(MessageError::EmptyContent) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "Message content must not be empty".to_string(),
            ),
            AppError::Message(MessageError::NotParticipant) => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "You are not a participant in this chat".to_string(),
            ),
            AppError::Message(MessageError::ChatNotFound) => (
                StatusCode::NOT_FOUND,
                "CHAT_NOT_FOUND",
                "Chat not found".to_string(),
            ),
            AppError::Message(MessageError::Storage(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORAGE_ERROR",
                "Storage temporarily unavailable, please retry".to_string(),
            ),
            AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg.clone())
            }
        };

        let body = json!({
            "data": null,
            "meta": {
                "request_id": "",
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "response_time_ms": 0
            },
            "errors": [{
                "code": code,
                "message": message,
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}
