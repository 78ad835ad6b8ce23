//! HTTP and WebSocket handlers.

pub mod chat;
pub mod message;
pub mod ws;
