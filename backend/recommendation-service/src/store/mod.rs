//! Read/write surfaces of the collaborators that own persistent data.
//!
//! The recommendation core never talks to a database directly; it goes
//! through these traits so the storage backend can be swapped (and mocked
//! in tests). `InMemoryStore` is the reference implementation used by the
//! worker binary and the integration tests.

mod memory;

pub use memory::{InMemoryStore, Snapshot};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{BehaviorEvent, Conversation, Item, ItemId, UserId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Item (role) catalog
#[async_trait]
pub trait ItemCatalog: Send + Sync {
    async fn list_all_items(&self) -> StoreResult<Vec<Item>>;
    async fn get_item_by_id(&self, id: ItemId) -> StoreResult<Option<Item>>;
}

/// Append-mostly log of behavior events
#[async_trait]
pub trait BehaviorStore: Send + Sync {
    /// Persist an event; returns it with the store-assigned id
    async fn insert(&self, event: BehaviorEvent) -> StoreResult<BehaviorEvent>;
    async fn select_by_user(&self, user_id: UserId) -> StoreResult<Vec<BehaviorEvent>>;
    async fn select_by_item(&self, item_id: ItemId) -> StoreResult<Vec<BehaviorEvent>>;
    async fn select_by_user_and_item(
        &self,
        user_id: UserId,
        item_id: ItemId,
    ) -> StoreResult<Vec<BehaviorEvent>>;
    async fn select_all(&self) -> StoreResult<Vec<BehaviorEvent>>;
    /// Events with `start <= created_at <= end`
    async fn select_by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<BehaviorEvent>>;
    /// Returns the number of deleted events
    async fn delete_by_user(&self, user_id: UserId) -> StoreResult<usize>;
    async fn delete_by_item(&self, item_id: ItemId) -> StoreResult<usize>;
    async fn count_by_user(&self, user_id: UserId) -> StoreResult<usize>;
    async fn count_by_item(&self, item_id: ItemId) -> StoreResult<usize>;
}

/// Chat history, used for the chat-count signal
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn select_by_user(&self, user_id: UserId) -> StoreResult<Vec<Conversation>>;
}
