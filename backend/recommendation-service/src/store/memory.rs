use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

use super::{BehaviorStore, ConversationStore, ItemCatalog, StoreResult};
use crate::models::{BehaviorEvent, Conversation, Item, ItemId, UserId};

/// Serializable seed data for [`InMemoryStore`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub behaviors: Vec<BehaviorEvent>,
    #[serde(default)]
    pub conversations: Vec<Conversation>,
}

impl Snapshot {
    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let file = File::open(path.as_ref())?;
        let snapshot: Snapshot = serde_json::from_reader(BufReader::new(file))?;

        info!(
            path = %path.as_ref().display(),
            items = snapshot.items.len(),
            behaviors = snapshot.behaviors.len(),
            conversations = snapshot.conversations.len(),
            "Loaded store snapshot"
        );

        Ok(snapshot)
    }
}

#[derive(Default)]
struct StoreState {
    items: Vec<Item>,
    behaviors: Vec<BehaviorEvent>,
    conversations: Vec<Conversation>,
    next_event_id: i64,
}

/// In-process store backing all three collaborator traits.
///
/// Every query returns rows in insertion order.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let next_event_id = snapshot
            .behaviors
            .iter()
            .filter_map(|b| b.id)
            .max()
            .unwrap_or(0);

        let store = Self::new();
        {
            let mut state = store.state.write();
            state.items = snapshot.items;
            state.conversations = snapshot.conversations;
            state.next_event_id = next_event_id;
            for mut event in snapshot.behaviors {
                if event.id.is_none() {
                    state.next_event_id += 1;
                    event.id = Some(state.next_event_id);
                }
                state.behaviors.push(event);
            }
        }
        store
    }

    /// Insert or replace a catalog entry
    pub fn upsert_item(&self, item: Item) {
        let mut state = self.state.write();
        match state.items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => *existing = item,
            None => state.items.push(item),
        }
    }

    pub fn add_conversation(&self, user_id: UserId, item_id: ItemId) -> Conversation {
        let mut state = self.state.write();
        let conversation = Conversation {
            id: state.conversations.len() as i64 + 1,
            user_id,
            item_id,
            created_at: Utc::now(),
        };
        state.conversations.push(conversation.clone());
        conversation
    }

    pub fn behavior_count(&self) -> usize {
        self.state.read().behaviors.len()
    }

    fn filter_behaviors<F>(&self, pred: F) -> Vec<BehaviorEvent>
    where
        F: Fn(&BehaviorEvent) -> bool,
    {
        self.state
            .read()
            .behaviors
            .iter()
            .filter(|b| pred(b))
            .cloned()
            .collect()
    }

    fn delete_behaviors<F>(&self, pred: F) -> usize
    where
        F: Fn(&BehaviorEvent) -> bool,
    {
        let mut state = self.state.write();
        let before = state.behaviors.len();
        state.behaviors.retain(|b| !pred(b));
        before - state.behaviors.len()
    }
}

#[async_trait]
impl ItemCatalog for InMemoryStore {
    async fn list_all_items(&self) -> StoreResult<Vec<Item>> {
        Ok(self.state.read().items.clone())
    }

    async fn get_item_by_id(&self, id: ItemId) -> StoreResult<Option<Item>> {
        Ok(self.state.read().items.iter().find(|i| i.id == id).cloned())
    }
}

#[async_trait]
impl BehaviorStore for InMemoryStore {
    async fn insert(&self, mut event: BehaviorEvent) -> StoreResult<BehaviorEvent> {
        let mut state = self.state.write();
        state.next_event_id += 1;
        event.id = Some(state.next_event_id);
        state.behaviors.push(event.clone());
        Ok(event)
    }

    async fn select_by_user(&self, user_id: UserId) -> StoreResult<Vec<BehaviorEvent>> {
        Ok(self.filter_behaviors(|b| b.user_id == user_id))
    }

    async fn select_by_item(&self, item_id: ItemId) -> StoreResult<Vec<BehaviorEvent>> {
        Ok(self.filter_behaviors(|b| b.item_id == item_id))
    }

    async fn select_by_user_and_item(
        &self,
        user_id: UserId,
        item_id: ItemId,
    ) -> StoreResult<Vec<BehaviorEvent>> {
        Ok(self.filter_behaviors(|b| b.user_id == user_id && b.item_id == item_id))
    }

    async fn select_all(&self) -> StoreResult<Vec<BehaviorEvent>> {
        Ok(self.state.read().behaviors.clone())
    }

    async fn select_by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<BehaviorEvent>> {
        Ok(self.filter_behaviors(|b| b.created_at >= start && b.created_at <= end))
    }

    async fn delete_by_user(&self, user_id: UserId) -> StoreResult<usize> {
        Ok(self.delete_behaviors(|b| b.user_id == user_id))
    }

    async fn delete_by_item(&self, item_id: ItemId) -> StoreResult<usize> {
        Ok(self.delete_behaviors(|b| b.item_id == item_id))
    }

    async fn count_by_user(&self, user_id: UserId) -> StoreResult<usize> {
        let state = self.state.read();
        Ok(state.behaviors.iter().filter(|b| b.user_id == user_id).count())
    }

    async fn count_by_item(&self, item_id: ItemId) -> StoreResult<usize> {
        let state = self.state.read();
        Ok(state.behaviors.iter().filter(|b| b.item_id == item_id).count())
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn select_by_user(&self, user_id: UserId) -> StoreResult<Vec<Conversation>> {
        Ok(self
            .state
            .read()
            .conversations
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect())
    }
}
