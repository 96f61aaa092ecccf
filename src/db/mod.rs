//! Entity store
//!
//! Persistence for users, posts, comments, messages and notifications.
//! Two interchangeable backends implement the repository traits:
//! - SQLite via sqlx (default)
//! - in-memory tables with an optional JSON snapshot file
//!
//! The backend is selected by `store.driver` in the configuration.
//!
//! # Usage
//!
//! ```ignore
//! use lostfound::config::StoreConfig;
//! use lostfound::db::create_store;
//!
//! let store = create_store(&StoreConfig::default()).await?;
//! store.backend.ping().await?;
//! let pending = store.posts.list(false, None).await?;
//! ```

pub mod memory;
pub mod migrations;
pub mod pool;
pub mod repositories;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{StoreConfig, StoreDriver};
use memory::MemoryStore;
use repositories::{
    CommentRepository, MessageRepository, NotificationRepository, PostRepository,
    SqlxCommentRepository, SqlxMessageRepository, SqlxNotificationRepository,
    SqlxPostRepository, SqlxUserRepository, UserRepository,
};

pub use pool::{create_pool, create_test_pool, DynDatabasePool, SqliteDatabase};

/// Backend-level operations that are not tied to one entity
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Check that the backend can serve requests
    async fn ping(&self) -> Result<()>;

    /// Which driver this backend implements
    fn driver(&self) -> StoreDriver;
}

#[async_trait]
impl StoreBackend for SqliteDatabase {
    async fn ping(&self) -> Result<()> {
        SqliteDatabase::ping(self).await
    }

    fn driver(&self) -> StoreDriver {
        StoreDriver::Sqlite
    }
}

/// Handles to every repository of one backend
#[derive(Clone)]
pub struct Store {
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub messages: Arc<dyn MessageRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub backend: Arc<dyn StoreBackend>,
}

impl Store {
    /// Build a store over an already migrated SQLite pool
    pub fn sqlite(pool: DynDatabasePool) -> Self {
        Self {
            users: SqlxUserRepository::boxed(pool.clone()),
            posts: SqlxPostRepository::boxed(pool.clone()),
            comments: SqlxCommentRepository::boxed(pool.clone()),
            messages: SqlxMessageRepository::boxed(pool.clone()),
            notifications: SqlxNotificationRepository::boxed(pool.clone()),
            backend: pool,
        }
    }

    /// Build a store over in-memory tables
    pub fn memory(memory: MemoryStore) -> Self {
        let shared = Arc::new(memory);
        Self {
            users: shared.clone(),
            posts: shared.clone(),
            comments: shared.clone(),
            messages: shared.clone(),
            notifications: shared.clone(),
            backend: shared,
        }
    }
}

/// Open the configured backend, running migrations or loading the snapshot.
pub async fn create_store(config: &StoreConfig) -> Result<Store> {
    match config.driver {
        StoreDriver::Sqlite => {
            let pool = create_pool(&config.url).await?;
            migrations::run_migrations(&pool).await?;
            tracing::info!("SQLite store ready at {}", config.url);
            Ok(Store::sqlite(pool))
        }
        StoreDriver::Memory => {
            let memory = MemoryStore::open(config.snapshot_path.clone()).await?;
            match &config.snapshot_path {
                Some(path) => tracing::info!("Memory store ready, snapshot at {:?}", path),
                None => tracing::info!("Memory store ready (no snapshot)"),
            }
            Ok(Store::memory(memory))
        }
    }
}
