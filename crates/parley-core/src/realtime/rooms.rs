//! Room-scoped broadcast bus for the realtime gateway.
//!
//! One `tokio::sync::broadcast` channel per chat room, created lazily on
//! first join, plus a single global channel for presence transitions.
//! Publishing to a room with no subscribers is a no-op; a room whose last
//! subscriber is gone is pruned on the next failed publish.

use dashmap::DashMap;
use tokio::sync::broadcast;

use parley_types::chat::ChatId;
use parley_types::event::ServerEvent;
use parley_types::presence::UserStatus;

/// Per-room and global broadcast channels.
///
/// Clonable handles are not needed: the bus is shared behind an `Arc` by the
/// gateway and the message service.
pub struct RoomBus {
    rooms: DashMap<ChatId, broadcast::Sender<ServerEvent>>,
    status: broadcast::Sender<ServerEvent>,
    capacity: usize,
}

impl RoomBus {
    /// Create a new bus; `capacity` applies to every room channel and the
    /// global status channel.
    pub fn new(capacity: usize) -> Self {
        let (status, _) = broadcast::channel(capacity);
        Self {
            rooms: DashMap::new(),
            status,
            capacity,
        }
    }

    /// Subscribe to a chat's room, creating the channel on first join.
    pub fn join(&self, chat_id: ChatId) -> broadcast::Receiver<ServerEvent> {
        self.rooms
            .entry(chat_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Broadcast an event to a chat's room.
    ///
    /// Returns the number of sessions reached; zero when the room does not
    /// exist or has no subscribers.
    pub fn publish(&self, chat_id: &ChatId, event: ServerEvent) -> usize {
        let reached = match self.rooms.get(chat_id) {
            Some(sender) => sender.send(event).unwrap_or(0),
            None => return 0,
        };
        if reached == 0 {
            // Last subscriber left; drop the dead channel.
            self.rooms
                .remove_if(chat_id, |_, sender| sender.receiver_count() == 0);
        }
        reached
    }

    /// Subscribe to global presence transitions.
    pub fn subscribe_status(&self) -> broadcast::Receiver<ServerEvent> {
        self.status.subscribe()
    }

    /// Broadcast a presence transition to every connected session.
    pub fn publish_status(&self, status: UserStatus) -> usize {
        self.status
            .send(ServerEvent::UserStatus(status))
            .unwrap_or(0)
    }

    /// Number of rooms currently held open.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

impl std::fmt::Debug for RoomBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomBus")
            .field("rooms", &self.rooms.len())
            .field("status_receivers", &self.status.receiver_count())
            .finish()
    }
}
