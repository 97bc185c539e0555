//! Application state wiring all components together.
//!
//! The core components are generic over the repository/verifier traits;
//! AppState pins them to the concrete SQLite implementations and owns one
//! shared instance of each, injected into the HTTP and WebSocket layers.
//! There is no global state anywhere: the registry and room tables live
//! here, with a lifetime tied to the server process.

use std::sync::Arc;

use confab_core::conversation::ConversationService;
use confab_core::dispatch::MessageDispatcher;
use confab_core::presence::PresenceBroadcaster;
use confab_core::registry::ConnectionRegistry;
use confab_core::relay::Relay;
use confab_core::room::RoomRouter;
use confab_infra::config::{database_url, resolve_data_dir};
use confab_infra::sqlite::directory::SqliteDirectoryRepository;
use confab_infra::sqlite::message::SqliteMessageRepository;
use confab_infra::sqlite::pool::DatabasePool;
use confab_infra::sqlite::token::SqliteTokenVerifier;

/// Concrete type aliases for the core generics pinned to infra implementations.
pub type ConcreteRegistry = ConnectionRegistry<SqliteDirectoryRepository>;

pub type ConcreteDispatcher =
    MessageDispatcher<SqliteMessageRepository, SqliteDirectoryRepository>;

pub type ConcreteConversations =
    ConversationService<SqliteMessageRepository, SqliteDirectoryRepository>;

pub type ConcreteRelay = Relay<SqliteMessageRepository, SqliteDirectoryRepository>;

pub type ConcretePresence = PresenceBroadcaster<SqliteDirectoryRepository>;

/// Shared application state holding every component.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ConcreteRegistry>,
    pub rooms: Arc<RoomRouter>,
    pub dispatcher: Arc<ConcreteDispatcher>,
    pub conversations: Arc<ConcreteConversations>,
    pub relay: Arc<ConcreteRelay>,
    pub presence: Arc<ConcretePresence>,
    pub verifier: Arc<SqliteTokenVerifier>,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: connect to the database, wire
    /// the components.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();

        // Ensure data directory exists
        tokio::fs::create_dir_all(&data_dir).await?;

        let db_pool = DatabasePool::new(&database_url(&data_dir)).await?;
        Ok(Self::with_pool(db_pool))
    }

    /// Wire all components onto an existing pool (tests use this directly).
    pub fn with_pool(db_pool: DatabasePool) -> Self {
        let messages = Arc::new(SqliteMessageRepository::new(db_pool.clone()));
        let directory = Arc::new(SqliteDirectoryRepository::new(db_pool.clone()));
        let verifier = Arc::new(SqliteTokenVerifier::new(db_pool.clone()));

        let registry = Arc::new(ConnectionRegistry::new(Arc::clone(&directory)));
        let rooms = Arc::new(RoomRouter::new());

        let dispatcher = Arc::new(MessageDispatcher::new(
            Arc::clone(&messages),
            Arc::clone(&directory),
            Arc::clone(&registry),
            Arc::clone(&rooms),
        ));
        let conversations = Arc::new(ConversationService::new(
            Arc::clone(&messages),
            Arc::clone(&directory),
        ));
        let relay = Arc::new(Relay::new(
            messages,
            Arc::clone(&registry),
            Arc::clone(&rooms),
        ));
        let presence = Arc::new(PresenceBroadcaster::new(Arc::clone(&registry)));

        Self {
            registry,
            rooms,
            dispatcher,
            conversations,
            relay,
            presence,
            verifier,
            db_pool,
        }
    }
}
