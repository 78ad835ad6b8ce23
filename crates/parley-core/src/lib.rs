//! Business logic and repository trait definitions for Parley.
//!
//! This crate defines the "ports" (repository, cache, presence traits) that
//! the infrastructure layer implements. It depends only on `parley-types` --
//! never on `parley-infra` or any database/IO crate.

pub mod cache;
pub mod chat;
pub mod directory;
pub mod message;
pub mod realtime;

#[cfg(test)]
pub(crate) mod testsupport;
