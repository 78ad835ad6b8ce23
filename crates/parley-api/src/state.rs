//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both CLI and REST
//! API. Services are generic over repository/cache traits, but AppState pins
//! them to the concrete infra implementations.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parley_core::chat::resolver::ChatResolver;
use parley_core::message::MessageService;
use parley_core::realtime::{InMemoryPresence, RoomBus};
use parley_infra::cache::InMemoryMessageCache;
use parley_infra::config::load_server_config;
use parley_infra::sqlite::chat::SqliteChatRepository;
use parley_infra::sqlite::pool::DatabasePool;
use parley_infra::sqlite::user::SqliteUserDirectory;

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteChatResolver = ChatResolver<SqliteChatRepository, SqliteUserDirectory>;

pub type ConcreteMessageService = MessageService<SqliteChatRepository, InMemoryMessageCache>;

/// Shared application state holding all services.
///
/// Used by CLI commands, REST handlers, and the WebSocket gateway.
#[derive(Clone)]
pub struct AppState {
    pub chat_resolver: Arc<ConcreteChatResolver>,
    pub message_service: Arc<ConcreteMessageService>,
    pub user_directory: Arc<SqliteUserDirectory>,
    pub presence: Arc<InMemoryPresence>,
    pub rooms: Arc<RoomBus>,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: connect to DB, wire services.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();

        // Ensure data directory exists
        tokio::fs::create_dir_all(&data_dir).await?;

        // Initialize database
        let db_url = format!(
            "sqlite://{}?mode=rwc",
            data_dir.join("parley.db").display()
        );
        let db_pool = DatabasePool::new(&db_url).await?;

        let config = load_server_config(&data_dir).await;

        // One room bus instance is shared by the message service (publishes
        // after commit) and the gateway (joins/subscribes).
        let rooms = Arc::new(RoomBus::new(config.room_capacity));
        let presence = Arc::new(InMemoryPresence::new());

        let cache = InMemoryMessageCache::with_limits(
            Duration::from_secs(config.cache_ttl_secs),
            config.cache_max_entries,
        );
        let message_service = MessageService::new(
            SqliteChatRepository::new(db_pool.clone()),
            cache,
            rooms.clone(),
        );

        let chat_resolver = ChatResolver::new(
            SqliteChatRepository::new(db_pool.clone()),
            SqliteUserDirectory::new(db_pool.clone()),
        );

        let user_directory = SqliteUserDirectory::new(db_pool.clone());

        Ok(Self {
            chat_resolver: Arc::new(chat_resolver),
            message_service: Arc::new(message_service),
            user_directory: Arc::new(user_directory),
            presence,
            rooms,
            data_dir,
            db_pool,
        })
    }
}

/// Resolve the data directory from `PARLEY_DATA_DIR`, falling back to
/// `~/.parley`.
pub fn resolve_data_dir() -> PathBuf {
    match std::env::var("PARLEY_DATA_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".parley")
        }
    }
}
