use async_trait::async_trait;
use std::sync::Arc;

use super::{Outcome, RecommendationStrategy};
use crate::models::{Item, PreferenceVector, ScoredItem, Strategy, UserId};
use crate::store::{ItemCatalog, StoreResult};

const CATEGORY_MATCH_BONUS: f64 = 2.0;
const CHAT_WEIGHT: f64 = 0.1;
const VIEW_WEIGHT: f64 = 0.05;
const LIKE_WEIGHT: f64 = 0.08;
const POPULARITY_WEIGHT: f64 = 0.001;

/// Category affinity plus user engagement plus a small popularity prior.
///
/// The engagement term is the same for every candidate, so it shifts
/// scores without changing their order.
pub fn personalized_score(item: &Item, vector: &PreferenceVector) -> f64 {
    let mut score = 0.0;

    if let (Some(category), Some(preferred)) = (&item.category, &vector.preferred_category) {
        if category == preferred {
            score += CATEGORY_MATCH_BONUS;
        }
    }

    score += CHAT_WEIGHT * vector.total_chats as f64;
    score += VIEW_WEIGHT * vector.total_views as f64;
    score += LIKE_WEIGHT * vector.total_likes as f64;
    score += POPULARITY_WEIGHT * item.popularity as f64;

    score
}

pub struct PersonalizedStrategy {
    catalog: Arc<dyn ItemCatalog>,
}

impl PersonalizedStrategy {
    pub fn new(catalog: Arc<dyn ItemCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl RecommendationStrategy for PersonalizedStrategy {
    fn kind(&self) -> Strategy {
        Strategy::Personalized
    }

    async fn recommend(
        &self,
        _user_id: UserId,
        vector: &PreferenceVector,
        limit: usize,
    ) -> StoreResult<Outcome> {
        if vector.is_empty() {
            return Ok(Outcome::ColdStart);
        }

        let scored = self
            .catalog
            .list_all_items()
            .await?
            .into_iter()
            .map(|item| {
                let score = personalized_score(&item, vector);
                ScoredItem { item, score }
            })
            .collect();

        Ok(Outcome::Ranked(ScoredItem::rank(scored, limit)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn item(id: i64, category: &str, popularity: i64) -> Item {
        Item {
            id,
            name: format!("role-{}", id),
            category: Some(category.to_string()),
            description: None,
            popularity,
        }
    }

    fn sci_fi_fan() -> PreferenceVector {
        let mut vector = PreferenceVector::empty(1);
        vector.total_chats = 5;
        vector.total_views = 2;
        vector.total_likes = 1;
        vector.category_preferences.insert("sci-fi".into(), 7);
        vector.preferred_category = Some("sci-fi".into());
        vector
    }

    #[test]
    fn test_score_components() {
        let vector = sci_fi_fan();
        let engagement = 0.1 * 5.0 + 0.05 * 2.0 + 0.08 * 1.0;

        let matching = personalized_score(&item(1, "sci-fi", 100), &vector);
        assert!((matching - (2.0 + engagement + 0.1)).abs() < 1e-9);

        let other = personalized_score(&item(2, "romance", 0), &vector);
        assert!((other - engagement).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_matching_category_ranks_first() {
        let store = InMemoryStore::new();
        store.upsert_item(item(1, "romance", 10));
        store.upsert_item(item(2, "sci-fi", 10));
        store.upsert_item(item(3, "mystery", 10));
        let strategy = PersonalizedStrategy::new(Arc::new(store));

        let outcome = strategy.recommend(1, &sci_fi_fan(), 2).await.unwrap();
        match outcome {
            Outcome::Ranked(items) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0].id, 2);
                // Equal scores keep catalog order
                assert_eq!(items[1].id, 1);
            }
            Outcome::ColdStart => panic!("expected ranked output"),
        }
    }

    #[tokio::test]
    async fn test_empty_vector_is_cold_start() {
        let strategy = PersonalizedStrategy::new(Arc::new(InMemoryStore::new()));
        let outcome = strategy
            .recommend(1, &PreferenceVector::empty(1), 10)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::ColdStart);
    }
}
