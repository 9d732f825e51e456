// ============================================
// Preference Vector Builder
// ============================================
//
// Aggregates a user's chat history and behavior events into:
// 1. Interaction counts per action type
// 2. Category → occurrence count
// 3. The single most preferred category
//
// Iteration order is conversations (store order) followed by behavior
// events (store order). The preferred category is the highest count;
// on ties the category encountered first wins.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

use crate::models::{ActionType, BehaviorEvent, Conversation, ItemId, PreferenceVector, UserId};
use crate::store::{BehaviorStore, ConversationStore, ItemCatalog, StoreResult};

pub struct PreferenceVectorBuilder {
    catalog: Arc<dyn ItemCatalog>,
    behaviors: Arc<dyn BehaviorStore>,
    conversations: Arc<dyn ConversationStore>,
}

impl PreferenceVectorBuilder {
    pub fn new(
        catalog: Arc<dyn ItemCatalog>,
        behaviors: Arc<dyn BehaviorStore>,
        conversations: Arc<dyn ConversationStore>,
    ) -> Self {
        Self {
            catalog,
            behaviors,
            conversations,
        }
    }

    /// Build the vector from the current store contents.
    ///
    /// A user with no history yields the empty vector, never an error;
    /// errors only come from the stores themselves.
    pub async fn build(&self, user_id: UserId) -> StoreResult<PreferenceVector> {
        let conversations = self.conversations.select_by_user(user_id).await?;
        let behaviors = self.behaviors.select_by_user(user_id).await?;

        if conversations.is_empty() && behaviors.is_empty() {
            return Ok(PreferenceVector::empty(user_id));
        }

        let mut item_ids: Vec<ItemId> = Vec::new();
        let mut seen = HashSet::new();
        for id in conversations
            .iter()
            .map(|c| c.item_id)
            .chain(behaviors.iter().map(|b| b.item_id))
        {
            if seen.insert(id) {
                item_ids.push(id);
            }
        }

        let mut categories = HashMap::with_capacity(item_ids.len());
        for id in item_ids {
            if let Some(category) = self
                .catalog
                .get_item_by_id(id)
                .await?
                .and_then(|item| item.category)
            {
                categories.insert(id, category);
            }
        }

        let vector = aggregate(user_id, &conversations, &behaviors, &categories);
        debug!(
            user_id,
            chats = vector.total_chats,
            views = vector.total_views,
            preferred = ?vector.preferred_category,
            "Preference vector built"
        );
        Ok(vector)
    }
}

/// Pure aggregation over already-fetched rows
pub fn aggregate(
    user_id: UserId,
    conversations: &[Conversation],
    behaviors: &[BehaviorEvent],
    categories: &HashMap<ItemId, String>,
) -> PreferenceVector {
    let mut vector = PreferenceVector::empty(user_id);
    let mut first_seen: Vec<String> = Vec::new();

    let mut count_category = |item_id: ItemId, vector: &mut PreferenceVector| {
        if let Some(category) = categories.get(&item_id) {
            let count = vector
                .category_preferences
                .entry(category.clone())
                .or_insert(0);
            if *count == 0 {
                first_seen.push(category.clone());
            }
            *count += 1;
        }
    };

    for conversation in conversations {
        vector.total_chats += 1;
        count_category(conversation.item_id, &mut vector);
    }

    for event in behaviors {
        match event.action_type {
            ActionType::Chat => vector.total_chats += 1,
            ActionType::View => vector.total_views += 1,
            ActionType::Click => vector.total_clicks += 1,
            ActionType::Like => vector.total_likes += 1,
            ActionType::Share => vector.total_shares += 1,
            ActionType::Other(_) => {}
        }
        count_category(event.item_id, &mut vector);
    }

    // Strictly greater keeps the earliest category on ties
    let mut best: Option<(&String, u32)> = None;
    for category in &first_seen {
        let count = vector.category_count(category);
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((category, count));
        }
    }
    vector.preferred_category = best.map(|(category, _)| category.clone());

    vector
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Item;
    use crate::store::InMemoryStore;

    fn event(user_id: UserId, item_id: ItemId, action: ActionType) -> BehaviorEvent {
        let weight = action.default_weight();
        BehaviorEvent::new(user_id, item_id, action, weight)
    }

    fn categories(pairs: &[(ItemId, &str)]) -> HashMap<ItemId, String> {
        pairs.iter().map(|(id, c)| (*id, c.to_string())).collect()
    }

    #[test]
    fn test_empty_inputs_yield_empty_vector() {
        let vector = aggregate(1, &[], &[], &HashMap::new());
        assert!(vector.is_empty());
        assert!(vector.preferred_category.is_none());
    }

    #[test]
    fn test_counts_by_action_type() {
        let behaviors = vec![
            event(1, 10, ActionType::View),
            event(1, 10, ActionType::View),
            event(1, 11, ActionType::Click),
            event(1, 11, ActionType::Like),
            event(1, 12, ActionType::Chat),
            event(1, 12, ActionType::Share),
            event(1, 12, ActionType::Other("poke".into())),
        ];
        let vector = aggregate(1, &[], &behaviors, &HashMap::new());

        assert_eq!(vector.total_views, 2);
        assert_eq!(vector.total_clicks, 1);
        assert_eq!(vector.total_likes, 1);
        assert_eq!(vector.total_chats, 1);
        assert_eq!(vector.total_shares, 1);
        assert!(!vector.is_empty());
    }

    #[test]
    fn test_preferred_category_is_highest_count() {
        let behaviors = vec![
            event(1, 10, ActionType::View),
            event(1, 11, ActionType::Chat),
            event(1, 11, ActionType::Chat),
        ];
        let cats = categories(&[(10, "romance"), (11, "sci-fi")]);
        let vector = aggregate(1, &[], &behaviors, &cats);

        assert_eq!(vector.preferred_category.as_deref(), Some("sci-fi"));
        assert_eq!(vector.category_count("sci-fi"), 2);
        assert_eq!(vector.category_count("romance"), 1);
    }

    #[test]
    fn test_tie_goes_to_first_encountered() {
        let conversations = vec![Conversation {
            id: 1,
            user_id: 1,
            item_id: 20,
            created_at: chrono::Utc::now(),
        }];
        let behaviors = vec![event(1, 10, ActionType::View)];
        let cats = categories(&[(10, "romance"), (20, "mystery")]);

        let vector = aggregate(1, &conversations, &behaviors, &cats);
        assert_eq!(vector.preferred_category.as_deref(), Some("mystery"));

        // Same counts, reversed encounter order
        let behaviors = vec![event(1, 10, ActionType::View), event(1, 20, ActionType::View)];
        let vector = aggregate(1, &[], &behaviors, &cats);
        assert_eq!(vector.preferred_category.as_deref(), Some("romance"));
    }

    #[tokio::test]
    async fn test_build_reads_all_stores() {
        let store = Arc::new(InMemoryStore::new());
        store.upsert_item(Item {
            id: 1,
            name: "Captain".into(),
            category: Some("sci-fi".into()),
            description: None,
            popularity: 0,
        });
        store.add_conversation(5, 1);
        store.insert(event(5, 1, ActionType::View)).await.unwrap();

        let builder = PreferenceVectorBuilder::new(store.clone(), store.clone(), store.clone());
        let vector = builder.build(5).await.unwrap();

        assert_eq!(vector.total_chats, 1);
        assert_eq!(vector.total_views, 1);
        assert_eq!(vector.category_count("sci-fi"), 2);
        assert_eq!(vector.preferred_category.as_deref(), Some("sci-fi"));

        let stranger = builder.build(99).await.unwrap();
        assert!(stranger.is_empty());
    }
}
