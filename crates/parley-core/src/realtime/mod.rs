//! Realtime fan-out primitives: room broadcast channels and presence.

pub mod presence;
pub mod rooms;

pub use presence::{InMemoryPresence, PresenceStore};
pub use rooms::RoomBus;
