//! Cross-layer tests composing the core services over the real SQLite
//! repositories, the in-memory cache, and the room bus.

use std::sync::Arc;
use std::time::Duration;

use parley_core::chat::resolver::ChatResolver;
use parley_core::message::MessageService;
use parley_core::realtime::{InMemoryPresence, PresenceStore, RoomBus};
use parley_types::error::MessageError;
use parley_types::event::ServerEvent;
use parley_types::presence::SessionId;
use parley_types::user::UserId;

use crate::cache::InMemoryMessageCache;
use crate::sqlite::chat::SqliteChatRepository;
use crate::sqlite::pool::DatabasePool;
use crate::sqlite::user::SqliteUserDirectory;

async fn test_pool() -> DatabasePool {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let url = format!("sqlite://{}?mode=rwc", db_path.display());
    std::mem::forget(dir);
    DatabasePool::new(&url).await.unwrap()
}

fn resolver(pool: &DatabasePool) -> ChatResolver<SqliteChatRepository, SqliteUserDirectory> {
    ChatResolver::new(
        SqliteChatRepository::new(pool.clone()),
        SqliteUserDirectory::new(pool.clone()),
    )
}

async fn seed_user(pool: &DatabasePool, name: &str) -> UserId {
    SqliteUserDirectory::new(pool.clone())
        .create_user(name, &format!("{name}@example.com"))
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn concurrent_resolution_converges_on_one_chat() {
    let pool = test_pool().await;
    let a = seed_user(&pool, "ada").await;
    let b = seed_user(&pool, "grace").await;

    // Both participants resolve at once, each through its own repository
    // handle over the shared pool.
    let left = resolver(&pool);
    let right = resolver(&pool);
    let (from_a, from_b) = tokio::join!(
        left.resolve_individual(a, b),
        right.resolve_individual(b, a),
    );

    let from_a = from_a.unwrap();
    let from_b = from_b.unwrap();
    assert_eq!(from_a.chat.id, from_b.chat.id);

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM chats")
        .fetch_one(&pool.reader)
        .await
        .unwrap();
    assert_eq!(count.0, 1);
}

#[tokio::test]
async fn end_to_end_send_history_and_presence() {
    let pool = test_pool().await;
    let a = seed_user(&pool, "ada").await;
    let b = seed_user(&pool, "grace").await;

    let chat = resolver(&pool).resolve_individual(a, b).await.unwrap().chat;

    let rooms = Arc::new(RoomBus::new(16));
    let service = MessageService::new(
        SqliteChatRepository::new(pool.clone()),
        InMemoryMessageCache::new(),
        rooms.clone(),
    );

    // B is live in the chat's room and sees A's message arrive.
    let mut room_rx = rooms.join(chat.id);
    let sent = service.send(a, chat.id, "hi").await.unwrap();
    match room_rx.recv().await.unwrap() {
        ServerEvent::ReceiveMessage { message } => assert_eq!(message, sent),
        other => panic!("unexpected event: {other:?}"),
    }

    // B's history starts with the new message.
    let history = service.history(b, chat.id, 10, 0).await.unwrap();
    assert_eq!(history.first(), Some(&sent));

    // An outsider gets nothing persisted and nothing broadcast.
    let outsider = seed_user(&pool, "eve").await;
    let err = service.send(outsider, chat.id, "intruding").await.unwrap_err();
    assert!(matches!(err, MessageError::NotParticipant));
    assert!(matches!(
        room_rx.try_recv(),
        Err(tokio::sync::broadcast::error::TryRecvError::Empty)
    ));

    // B is online over two sessions; only the last disconnect goes offline
    // and broadcasts globally.
    let presence = InMemoryPresence::new();
    let mut status_rx = rooms.subscribe_status();
    let (s1, s2) = (SessionId::new(), SessionId::new());
    presence.connect(b, s1);
    presence.connect(b, s2);

    assert!(!presence.disconnect(&b, &s1));
    assert!(presence.is_online(&b));

    assert!(presence.disconnect(&b, &s2));
    rooms.publish_status(parley_types::presence::UserStatus {
        user_id: b,
        online: false,
    });
    match status_rx.recv().await.unwrap() {
        ServerEvent::UserStatus(status) => {
            assert_eq!(status.user_id, b);
            assert!(!status.online);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn history_is_identical_from_cache_and_store() {
    let pool = test_pool().await;
    let a = seed_user(&pool, "ada").await;
    let b = seed_user(&pool, "grace").await;
    let chat = resolver(&pool).resolve_individual(a, b).await.unwrap().chat;

    let rooms = Arc::new(RoomBus::new(16));
    let warm = MessageService::new(
        SqliteChatRepository::new(pool.clone()),
        InMemoryMessageCache::new(),
        rooms.clone(),
    );

    for i in 0..7 {
        warm.send(a, chat.id, &format!("message {i}")).await.unwrap();
    }

    // Warm service serves from the slot its sends populated.
    let from_cache = warm.history(b, chat.id, 50, 0).await.unwrap();
    assert_eq!(from_cache.len(), 7);
    assert_eq!(from_cache[0].content, "message 6");

    // A service with a cold cache serves the same window from the store.
    let cold = MessageService::new(
        SqliteChatRepository::new(pool.clone()),
        InMemoryMessageCache::new(),
        rooms,
    );
    let from_store = cold.history(b, chat.id, 50, 0).await.unwrap();
    assert_eq!(from_store, from_cache);
}

#[tokio::test]
async fn expired_cache_repopulates_without_altering_content() {
    let pool = test_pool().await;
    let a = seed_user(&pool, "ada").await;
    let b = seed_user(&pool, "grace").await;
    let chat = resolver(&pool).resolve_individual(a, b).await.unwrap().chat;

    let cache = InMemoryMessageCache::with_limits(Duration::from_millis(40), 64);
    let rooms = Arc::new(RoomBus::new(16));
    let service = MessageService::new(SqliteChatRepository::new(pool.clone()), cache, rooms);

    let sent = service.send(a, chat.id, "hi").await.unwrap();

    tokio::time::sleep(Duration::from_millis(80)).await;

    // First call after expiry reads the store and backfills transparently.
    let history = service.history(b, chat.id, 10, 0).await.unwrap();
    assert_eq!(history, vec![sent.clone()]);

    // Second call is a cache hit with identical content.
    let again = service.history(b, chat.id, 10, 0).await.unwrap();
    assert_eq!(again, vec![sent]);
}
