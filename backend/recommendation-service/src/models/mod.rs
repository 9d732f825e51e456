use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

pub type UserId = i64;
pub type ItemId = i64;

/// User interaction kinds recorded against a role
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionType {
    View,
    Click,
    Chat,
    Like,
    Share,
    /// Unrecognized action, stored verbatim
    Other(String),
}

impl ActionType {
    /// Known names match case-insensitively; anything else is kept as given.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "view" => ActionType::View,
            "click" => ActionType::Click,
            "chat" => ActionType::Chat,
            "like" => ActionType::Like,
            "share" => ActionType::Share,
            _ => ActionType::Other(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ActionType::View => "view",
            ActionType::Click => "click",
            ActionType::Chat => "chat",
            ActionType::Like => "like",
            ActionType::Share => "share",
            ActionType::Other(raw) => raw.as_str(),
        }
    }

    /// Weight stored when a caller records an action without an explicit score
    pub fn default_weight(&self) -> f64 {
        match self {
            ActionType::View => 1.0,
            ActionType::Click => 2.0,
            ActionType::Like => 3.0,
            ActionType::Share => 4.0,
            ActionType::Chat => 5.0,
            ActionType::Other(_) => 0.0,
        }
    }

    /// Multiplier applied to stored weights by collaborative filtering
    pub fn collaborative_multiplier(&self) -> f64 {
        match self {
            ActionType::Chat => 1.0,
            ActionType::Like => 0.8,
            ActionType::Click => 0.5,
            ActionType::View => 0.3,
            ActionType::Share => 1.0,
            ActionType::Other(_) => 0.0,
        }
    }
}

impl From<String> for ActionType {
    fn from(raw: String) -> Self {
        ActionType::parse(&raw)
    }
}

impl From<ActionType> for String {
    fn from(action: ActionType) -> Self {
        action.as_str().to_string()
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ranking strategies exposed by the facade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Personalized,
    ContentBased,
    Collaborative,
    Hybrid,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::Personalized,
        Strategy::ContentBased,
        Strategy::Collaborative,
        Strategy::Hybrid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Personalized => "personalized",
            Strategy::ContentBased => "content",
            Strategy::Collaborative => "collaborative",
            Strategy::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of a user interacting with a role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorEvent {
    /// Assigned by the store on insert
    #[serde(default)]
    pub id: Option<i64>,
    pub user_id: UserId,
    pub item_id: ItemId,
    pub action_type: ActionType,
    pub weight: f64,
    pub created_at: DateTime<Utc>,
}

impl BehaviorEvent {
    pub fn new(user_id: UserId, item_id: ItemId, action_type: ActionType, weight: f64) -> Self {
        Self {
            id: None,
            user_id,
            item_id,
            action_type,
            weight,
            created_at: Utc::now(),
        }
    }
}

/// Catalog entry (an AI role)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Global view counter
    #[serde(default)]
    pub popularity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    pub user_id: UserId,
    pub item_id: ItemId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ScoredItem {
    pub item: Item,
    pub score: f64,
}

impl ScoredItem {
    /// Sort descending by score. `sort_by` is stable, so equal scores keep
    /// catalog order.
    pub fn rank(mut scored: Vec<ScoredItem>, limit: usize) -> Vec<Item> {
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored.into_iter().take(limit).map(|s| s.item).collect()
    }
}

/// Per-user aggregate of interaction counts and category affinity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreferenceVector {
    pub user_id: UserId,
    pub total_chats: u32,
    pub total_views: u32,
    pub total_clicks: u32,
    pub total_likes: u32,
    pub total_shares: u32,
    pub category_preferences: HashMap<String, u32>,
    pub preferred_category: Option<String>,
}

impl PreferenceVector {
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            ..Default::default()
        }
    }

    /// No personalization signal available
    pub fn is_empty(&self) -> bool {
        self.total_chats == 0
            && self.total_views == 0
            && self.total_clicks == 0
            && self.total_likes == 0
            && self.total_shares == 0
            && self.category_preferences.is_empty()
    }

    pub fn category_count(&self, category: &str) -> u32 {
        self.category_preferences.get(category).copied().unwrap_or(0)
    }
}

/// Behavior statistics for one user over a time window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorStats {
    pub user_id: UserId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub total_actions: usize,
    pub action_counts: BTreeMap<String, usize>,
    pub average_score: f64,
}
