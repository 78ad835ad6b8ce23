//! Shared domain types for Parley.
//!
//! This crate contains the core domain types used across the Parley backend:
//! User, Chat, Message, presence records, gateway wire events, and their
//! associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod chat;
pub mod error;
pub mod event;
pub mod message;
pub mod presence;
pub mod user;
