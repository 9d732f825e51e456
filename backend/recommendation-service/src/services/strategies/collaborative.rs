use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

use super::{Outcome, RecommendationStrategy};
use crate::models::{BehaviorEvent, ItemId, PreferenceVector, Strategy, UserId};
use crate::store::{BehaviorStore, ItemCatalog, StoreResult};

/// User-based collaborative filtering
///
/// Algorithm:
/// 1. Collect the interacted item set of every user from the behavior log
/// 2. Pick the users most similar to the target (Jaccard over item sets)
/// 3. Sum `weight × action multiplier` per item over the similar users' events
/// 4. Rank by accumulated score, item id ascending on ties
///
/// Items the target already interacted with are not filtered out.
pub struct CollaborativeStrategy {
    catalog: Arc<dyn ItemCatalog>,
    behaviors: Arc<dyn BehaviorStore>,
    max_similar_users: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarUser {
    pub user_id: UserId,
    pub similarity: f64,
}

/// |A ∩ B| / |A ∪ B|. Two empty sets are identical (1.0).
pub fn jaccard_similarity(a: &HashSet<ItemId>, b: &HashSet<ItemId>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

/// Users with positive similarity to `target`, most similar first (user id
/// ascending on ties), capped at `max_users`.
pub fn find_similar_users(
    user_id: UserId,
    target: &HashSet<ItemId>,
    item_sets: &BTreeMap<UserId, HashSet<ItemId>>,
    max_users: usize,
) -> Vec<SimilarUser> {
    let mut similar: Vec<SimilarUser> = item_sets
        .iter()
        .filter(|(other, _)| **other != user_id)
        .map(|(other, items)| SimilarUser {
            user_id: *other,
            similarity: jaccard_similarity(target, items),
        })
        .filter(|s| s.similarity > 0.0)
        .collect();

    similar.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
            .then(a.user_id.cmp(&b.user_id))
    });
    similar.truncate(max_users);
    similar
}

/// Accumulated scores, ranked descending with item id ascending on ties
fn accumulate(
    similar: &[SimilarUser],
    events_by_user: &HashMap<UserId, Vec<&BehaviorEvent>>,
) -> Vec<(ItemId, f64)> {
    let mut scores: HashMap<ItemId, f64> = HashMap::new();
    for user in similar {
        let Some(events) = events_by_user.get(&user.user_id) else {
            continue;
        };
        for event in events {
            *scores.entry(event.item_id).or_insert(0.0) +=
                event.weight * event.action_type.collaborative_multiplier();
        }
    }

    let mut ranked: Vec<(ItemId, f64)> = scores.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    ranked
}

impl CollaborativeStrategy {
    pub fn new(
        catalog: Arc<dyn ItemCatalog>,
        behaviors: Arc<dyn BehaviorStore>,
        max_similar_users: usize,
    ) -> Self {
        Self {
            catalog,
            behaviors,
            max_similar_users,
        }
    }
}

#[async_trait]
impl RecommendationStrategy for CollaborativeStrategy {
    fn kind(&self) -> Strategy {
        Strategy::Collaborative
    }

    async fn recommend(
        &self,
        user_id: UserId,
        _vector: &PreferenceVector,
        limit: usize,
    ) -> StoreResult<Outcome> {
        // Full scan of the behavior log per call
        let events = self.behaviors.select_all().await?;

        let mut item_sets: BTreeMap<UserId, HashSet<ItemId>> = BTreeMap::new();
        let mut events_by_user: HashMap<UserId, Vec<&BehaviorEvent>> = HashMap::new();
        for event in &events {
            item_sets
                .entry(event.user_id)
                .or_default()
                .insert(event.item_id);
            events_by_user.entry(event.user_id).or_default().push(event);
        }

        let target = item_sets.get(&user_id).cloned().unwrap_or_default();
        let similar = find_similar_users(user_id, &target, &item_sets, self.max_similar_users);

        if similar.is_empty() {
            debug!(user_id, "No similar users, collaborative cold start");
            return Ok(Outcome::ColdStart);
        }

        let ranked = accumulate(&similar, &events_by_user);
        debug!(
            user_id,
            similar_users = similar.len(),
            candidates = ranked.len(),
            "Collaborative scores accumulated"
        );

        let mut items = Vec::with_capacity(limit.min(ranked.len()));
        for (item_id, _) in ranked {
            if items.len() >= limit {
                break;
            }
            // Ids with no catalog entry are skipped
            if let Some(item) = self.catalog.get_item_by_id(item_id).await? {
                items.push(item);
            }
        }

        Ok(Outcome::Ranked(items))
    }
}
