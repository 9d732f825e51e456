// ============================================
// Hybrid Rank Fusion
// ============================================
//
// Each strategy list contributes (list_len - position) × weight to every
// item it contains. Items missing from a list get nothing from it.
// Final order: fused score descending, item id ascending on ties.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::config::ConfigError;
use crate::models::{Item, ItemId, Strategy};

const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Per-strategy fusion weights; always non-negative and summing to 1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HybridWeights {
    personalized: f64,
    content: f64,
    collaborative: f64,
}

impl HybridWeights {
    pub fn new(personalized: f64, content: f64, collaborative: f64) -> Result<Self, ConfigError> {
        let sum = personalized + content + collaborative;
        let negative = personalized < 0.0 || content < 0.0 || collaborative < 0.0;
        if negative || (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::WeightSum(sum));
        }
        Ok(Self {
            personalized,
            content,
            collaborative,
        })
    }

    /// 0.4 / 0.3 / 0.3
    pub fn balanced() -> Self {
        Self {
            personalized: 0.4,
            content: 0.3,
            collaborative: 0.3,
        }
    }

    pub fn weight(&self, strategy: Strategy) -> f64 {
        match strategy {
            Strategy::Personalized => self.personalized,
            Strategy::ContentBased => self.content,
            Strategy::Collaborative => self.collaborative,
            Strategy::Hybrid => 0.0,
        }
    }
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self::balanced()
    }
}

/// Fuse ranked lists into one list of at most `limit` items
pub fn fuse(lists: &[(Strategy, Vec<Item>)], weights: &HybridWeights, limit: usize) -> Vec<Item> {
    let mut fused: HashMap<ItemId, (f64, &Item)> = HashMap::new();

    for (strategy, items) in lists {
        let weight = weights.weight(*strategy);
        let len = items.len();
        for (position, item) in items.iter().enumerate() {
            let contribution = (len - position) as f64 * weight;
            fused
                .entry(item.id)
                .and_modify(|(score, _)| *score += contribution)
                .or_insert((contribution, item));
        }
    }

    let mut ranked: Vec<(f64, &Item)> = fused.into_values().collect();
    ranked.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(Ordering::Equal)
            .then(a.1.id.cmp(&b.1.id))
    });

    ranked
        .into_iter()
        .take(limit)
        .map(|(_, item)| item.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(ids: &[ItemId]) -> Vec<Item> {
        ids.iter()
            .map(|&id| Item {
                id,
                name: format!("role-{}", id),
                category: None,
                description: None,
                popularity: 0,
            })
            .collect()
    }

    fn ids(items: &[Item]) -> Vec<ItemId> {
        items.iter().map(|i| i.id).collect()
    }

    #[test]
    fn test_weights_validation() {
        assert!(HybridWeights::new(0.4, 0.3, 0.3).is_ok());
        assert!(HybridWeights::new(0.5, 0.5, 0.0).is_ok());
        assert!(matches!(
            HybridWeights::new(0.5, 0.3, 0.3),
            Err(ConfigError::WeightSum(_))
        ));
        assert!(HybridWeights::new(1.2, -0.1, -0.1).is_err());

        let balanced = HybridWeights::balanced();
        let sum = balanced.weight(Strategy::Personalized)
            + balanced.weight(Strategy::ContentBased)
            + balanced.weight(Strategy::Collaborative);
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_shared_top_item_wins() {
        let lists = vec![
            (Strategy::Personalized, items(&[7, 1, 2])),
            (Strategy::ContentBased, items(&[7, 3, 4])),
            (Strategy::Collaborative, items(&[7, 5, 6])),
        ];
        let fused = fuse(&lists, &HybridWeights::balanced(), 10);
        assert_eq!(fused[0].id, 7);
        assert_eq!(fused.len(), 7);
    }

    #[test]
    fn test_fusion_scores_and_ties() {
        // personalized: 1 → 2×0.4, 2 → 1×0.4
        // content:      2 → 2×0.3, 3 → 1×0.3
        // collaborative: empty
        let lists = vec![
            (Strategy::Personalized, items(&[1, 2])),
            (Strategy::ContentBased, items(&[2, 3])),
            (Strategy::Collaborative, Vec::new()),
        ];
        let fused = fuse(&lists, &HybridWeights::balanced(), 10);
        // 2: 1.0, 1: 0.8, 3: 0.3
        assert_eq!(ids(&fused), vec![2, 1, 3]);

        let tied = vec![
            (Strategy::ContentBased, items(&[9])),
            (Strategy::Collaborative, items(&[4])),
        ];
        assert_eq!(ids(&fuse(&tied, &HybridWeights::balanced(), 10)), vec![4, 9]);
    }

    #[test]
    fn test_identical_lists_keep_order() {
        let list = items(&[5, 3, 8, 1]);
        let lists = vec![
            (Strategy::Personalized, list.clone()),
            (Strategy::ContentBased, list.clone()),
            (Strategy::Collaborative, list.clone()),
        ];
        assert_eq!(
            ids(&fuse(&lists, &HybridWeights::balanced(), 3)),
            vec![5, 3, 8]
        );
    }
}
