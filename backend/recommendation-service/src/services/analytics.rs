//! Read-side queries over the behavior log
//!
//! Used by the cache warmer to find active users and by operators to
//! inspect engagement. None of these results are cached.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::Arc;

use crate::models::{BehaviorEvent, BehaviorStats, ItemId, UserId};
use crate::store::{BehaviorStore, StoreResult};

pub struct BehaviorAnalytics {
    behaviors: Arc<dyn BehaviorStore>,
}

/// Count occurrences of `key(event)`, most frequent first, id ascending on ties
fn top_by_count<K, F>(events: &[BehaviorEvent], key: F, limit: usize) -> Vec<(K, usize)>
where
    K: Copy + Eq + Hash + Ord,
    F: Fn(&BehaviorEvent) -> K,
{
    let mut counts: HashMap<K, usize> = HashMap::new();
    for event in events {
        *counts.entry(key(event)).or_insert(0) += 1;
    }

    let mut ranked: Vec<(K, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}

impl BehaviorAnalytics {
    pub fn new(behaviors: Arc<dyn BehaviorStore>) -> Self {
        Self { behaviors }
    }

    pub async fn user_behaviors(&self, user_id: UserId) -> StoreResult<Vec<BehaviorEvent>> {
        self.behaviors.select_by_user(user_id).await
    }

    pub async fn item_behaviors(&self, item_id: ItemId) -> StoreResult<Vec<BehaviorEvent>> {
        self.behaviors.select_by_item(item_id).await
    }

    pub async fn user_item_behaviors(
        &self,
        user_id: UserId,
        item_id: ItemId,
    ) -> StoreResult<Vec<BehaviorEvent>> {
        self.behaviors.select_by_user_and_item(user_id, item_id).await
    }

    /// Items with the most recorded actions
    pub async fn popular_items_by_actions(&self, limit: usize) -> StoreResult<Vec<(ItemId, usize)>> {
        let events = self.behaviors.select_all().await?;
        Ok(top_by_count(&events, |e| e.item_id, limit))
    }

    /// Users with the most recorded actions
    pub async fn active_users(&self, limit: usize) -> StoreResult<Vec<(UserId, usize)>> {
        let events = self.behaviors.select_all().await?;
        Ok(top_by_count(&events, |e| e.user_id, limit))
    }

    /// Users with the most actions in `[start, end]`
    pub async fn active_users_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<(UserId, usize)>> {
        let events = self.behaviors.select_by_time_range(start, end).await?;
        Ok(top_by_count(&events, |e| e.user_id, limit))
    }

    pub async fn user_stats(
        &self,
        user_id: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<BehaviorStats> {
        let events: Vec<BehaviorEvent> = self
            .behaviors
            .select_by_time_range(start, end)
            .await?
            .into_iter()
            .filter(|e| e.user_id == user_id)
            .collect();

        let mut action_counts = BTreeMap::new();
        for event in &events {
            *action_counts
                .entry(event.action_type.as_str().to_string())
                .or_insert(0) += 1;
        }

        let average_score = if events.is_empty() {
            0.0
        } else {
            events.iter().map(|e| e.weight).sum::<f64>() / events.len() as f64
        };

        Ok(BehaviorStats {
            user_id,
            start,
            end,
            total_actions: events.len(),
            action_counts,
            average_score,
        })
    }

    /// Total recorded actions by this user
    pub async fn user_summary(&self, user_id: UserId) -> StoreResult<usize> {
        self.behaviors.count_by_user(user_id).await
    }

    /// Total recorded actions on this item
    pub async fn item_summary(&self, item_id: ItemId) -> StoreResult<usize> {
        self.behaviors.count_by_item(item_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActionType;
    use crate::store::InMemoryStore;
    use chrono::Duration;

    async fn seeded() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        let events = [
            (1, 10, ActionType::Chat, 5.0),
            (1, 10, ActionType::View, 1.0),
            (1, 11, ActionType::Like, 3.0),
            (2, 11, ActionType::View, 1.0),
            (2, 12, ActionType::View, 1.0),
            (3, 11, ActionType::Chat, 5.0),
        ];
        for (user, item, action, weight) in events {
            store
                .insert(BehaviorEvent::new(user, item, action, weight))
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_rankings() {
        let analytics = BehaviorAnalytics::new(seeded().await);

        let items = analytics.popular_items_by_actions(2).await.unwrap();
        assert_eq!(items, vec![(11, 3), (10, 2)]);

        let users = analytics.active_users(10).await.unwrap();
        assert_eq!(users, vec![(1, 3), (2, 2), (3, 1)]);
    }

    #[tokio::test]
    async fn test_user_stats() {
        let analytics = BehaviorAnalytics::new(seeded().await);
        let now = Utc::now();

        let stats = analytics
            .user_stats(1, now - Duration::hours(1), now + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(stats.total_actions, 3);
        assert_eq!(stats.action_counts.get("chat"), Some(&1));
        assert_eq!(stats.action_counts.get("view"), Some(&1));
        assert!((stats.average_score - 3.0).abs() < 1e-9);

        let empty = analytics
            .user_stats(1, now - Duration::hours(3), now - Duration::hours(2))
            .await
            .unwrap();
        assert_eq!(empty.total_actions, 0);
        assert_eq!(empty.average_score, 0.0);
    }

    #[tokio::test]
    async fn test_summaries() {
        let analytics = BehaviorAnalytics::new(seeded().await);
        assert_eq!(analytics.user_summary(2).await.unwrap(), 2);
        assert_eq!(analytics.item_summary(11).await.unwrap(), 3);
        assert_eq!(analytics.user_item_behaviors(1, 10).await.unwrap().len(), 2);
    }
}
