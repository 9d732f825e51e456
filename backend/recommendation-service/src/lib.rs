pub mod cache;
pub mod config;
pub mod error;
pub mod jobs;
pub mod metrics;
pub mod models;
pub mod services;
pub mod store;

pub use config::Config;
pub use error::{AppError, Result};
pub use models::{ActionType, BehaviorEvent, Item, PreferenceVector, Strategy};
pub use services::{BehaviorAnalytics, RecommendationService};
pub use store::{BehaviorStore, ConversationStore, InMemoryStore, ItemCatalog, Snapshot};
