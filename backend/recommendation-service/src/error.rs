use thiserror::Error;

use crate::config::ConfigError;
use crate::store::StoreError;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Metrics registration failed: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl AppError {
    /// Short label used for the `reason` dimension of fallback metrics
    pub fn reason(&self) -> &'static str {
        match self {
            AppError::Store(StoreError::Unavailable(_)) => "store_unavailable",
            AppError::Store(_) => "store_error",
            AppError::Config(_) => "config",
            AppError::Metrics(_) => "metrics",
        }
    }
}
