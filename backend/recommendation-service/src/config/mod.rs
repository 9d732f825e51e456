use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::services::HybridWeights;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: String, value: String },

    #[error("hybrid weights must be non-negative and sum to 1.0, got {0}")]
    WeightSum(f64),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub recommendation: RecommendationConfig,
    pub cache_warmer: CacheWarmerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub env: String,
    pub service_name: String,
    /// JSON snapshot used to seed the in-memory store
    pub snapshot_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationConfig {
    /// TTL of per-user strategy results and preference vectors
    pub cache_ttl: Duration,
    pub popular_ttl: Duration,
    pub popular_size: usize,
    pub default_limit: usize,
    pub max_limit: usize,
    pub max_similar_users: usize,
    /// Deadline for each hybrid sub-strategy
    pub hybrid_timeout: Duration,
    pub personalized_weight: f64,
    pub content_weight: f64,
    pub collaborative_weight: f64,
    pub refresh_interval: Duration,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(5 * 60),
            popular_ttl: Duration::from_secs(30 * 60),
            popular_size: 50,
            default_limit: 10,
            max_limit: 100,
            max_similar_users: 20,
            hybrid_timeout: Duration::from_millis(2000),
            personalized_weight: 0.4,
            content_weight: 0.3,
            collaborative_weight: 0.3,
            refresh_interval: Duration::from_secs(10 * 60),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheWarmerConfig {
    pub enabled: bool,
    pub warm_interval: Duration,
    pub max_users_per_cycle: usize,
    pub activity_window_hours: i64,
}

impl Default for CacheWarmerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            warm_interval: Duration::from_secs(5 * 60),
            max_users_per_cycle: 500,
            activity_window_hours: 24,
        }
    }
}

fn parse_var<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            value: raw,
        }),
        Err(_) => Ok(default),
    }
}

fn secs_var(key: &str, default: Duration) -> Result<Duration, ConfigError> {
    parse_var(key, default.as_secs()).map(Duration::from_secs)
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = RecommendationConfig::default();
        let recommendation = RecommendationConfig {
            cache_ttl: secs_var("REC_CACHE_TTL_SECS", defaults.cache_ttl)?,
            popular_ttl: secs_var("REC_POPULAR_TTL_SECS", defaults.popular_ttl)?,
            popular_size: parse_var("REC_POPULAR_SIZE", defaults.popular_size)?,
            default_limit: parse_var("REC_DEFAULT_LIMIT", defaults.default_limit)?,
            max_limit: parse_var("REC_MAX_LIMIT", defaults.max_limit)?,
            max_similar_users: parse_var("REC_MAX_SIMILAR_USERS", defaults.max_similar_users)?,
            hybrid_timeout: parse_var(
                "REC_HYBRID_TIMEOUT_MS",
                defaults.hybrid_timeout.as_millis() as u64,
            )
            .map(Duration::from_millis)?,
            personalized_weight: parse_var(
                "REC_WEIGHT_PERSONALIZED",
                defaults.personalized_weight,
            )?,
            content_weight: parse_var("REC_WEIGHT_CONTENT", defaults.content_weight)?,
            collaborative_weight: parse_var(
                "REC_WEIGHT_COLLABORATIVE",
                defaults.collaborative_weight,
            )?,
            refresh_interval: secs_var("REC_REFRESH_INTERVAL_SECS", defaults.refresh_interval)?,
        };
        recommendation.validate()?;

        let warmer_defaults = CacheWarmerConfig::default();
        let cache_warmer = CacheWarmerConfig {
            enabled: parse_var("CACHE_WARMER_ENABLED", warmer_defaults.enabled)?,
            warm_interval: secs_var("CACHE_WARMER_INTERVAL_SECS", warmer_defaults.warm_interval)?,
            max_users_per_cycle: parse_var(
                "CACHE_WARMER_MAX_USERS",
                warmer_defaults.max_users_per_cycle,
            )?,
            activity_window_hours: parse_var(
                "CACHE_WARMER_ACTIVITY_WINDOW_HOURS",
                warmer_defaults.activity_window_hours,
            )?,
        };

        Ok(Config {
            service: ServiceConfig {
                env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                service_name: env::var("SERVICE_NAME")
                    .unwrap_or_else(|_| "recommendation-service".to_string()),
                snapshot_path: env::var("SNAPSHOT_PATH").ok(),
            },
            recommendation,
            cache_warmer,
        })
    }
}

impl RecommendationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_limit == 0 {
            return Err(ConfigError::Invalid {
                key: "REC_DEFAULT_LIMIT".to_string(),
                value: self.default_limit.to_string(),
            });
        }
        if self.max_limit < self.default_limit {
            return Err(ConfigError::Invalid {
                key: "REC_MAX_LIMIT".to_string(),
                value: self.max_limit.to_string(),
            });
        }
        self.weights().map(|_| ())
    }

    pub fn weights(&self) -> Result<HybridWeights, ConfigError> {
        HybridWeights::new(
            self.personalized_weight,
            self.content_weight,
            self.collaborative_weight,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: &[&str] = &[
        "REC_CACHE_TTL_SECS",
        "REC_DEFAULT_LIMIT",
        "REC_MAX_LIMIT",
        "REC_HYBRID_TIMEOUT_MS",
        "REC_WEIGHT_PERSONALIZED",
        "REC_WEIGHT_CONTENT",
        "REC_WEIGHT_COLLABORATIVE",
        "CACHE_WARMER_ENABLED",
    ];

    fn clear_vars() {
        for key in VARS {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial_test::serial]
    fn test_defaults_from_env() {
        clear_vars();
        let config = Config::from_env().unwrap();

        assert_eq!(config.recommendation.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.recommendation.popular_ttl, Duration::from_secs(1800));
        assert_eq!(config.recommendation.popular_size, 50);
        assert_eq!(config.recommendation.default_limit, 10);
        assert_eq!(config.recommendation.max_similar_users, 20);
        assert!(config.cache_warmer.enabled);
    }

    #[test]
    #[serial_test::serial]
    fn test_overrides_from_env() {
        clear_vars();
        env::set_var("REC_CACHE_TTL_SECS", "60");
        env::set_var("REC_HYBRID_TIMEOUT_MS", "250");
        env::set_var("CACHE_WARMER_ENABLED", "false");

        let config = Config::from_env().unwrap();
        assert_eq!(config.recommendation.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.recommendation.hybrid_timeout, Duration::from_millis(250));
        assert!(!config.cache_warmer.enabled);

        clear_vars();
    }

    #[test]
    #[serial_test::serial]
    fn test_invalid_value_is_reported() {
        clear_vars();
        env::set_var("REC_DEFAULT_LIMIT", "ten");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "REC_DEFAULT_LIMIT"));

        clear_vars();
    }

    #[test]
    #[serial_test::serial]
    fn test_weights_must_sum_to_one() {
        clear_vars();
        env::set_var("REC_WEIGHT_PERSONALIZED", "0.5");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::WeightSum(_)));

        clear_vars();
    }

    #[test]
    #[serial_test::serial]
    fn test_zero_default_limit_is_rejected() {
        clear_vars();
        env::set_var("REC_DEFAULT_LIMIT", "0");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "REC_DEFAULT_LIMIT"));

        clear_vars();
    }

    #[test]
    #[serial_test::serial]
    fn test_max_limit_below_default_is_rejected() {
        clear_vars();
        env::set_var("REC_DEFAULT_LIMIT", "20");
        env::set_var("REC_MAX_LIMIT", "5");

        let err = Config::from_env().unwrap_err();
        assert!(
            matches!(err, ConfigError::Invalid { ref key, ref value } if key == "REC_MAX_LIMIT" && value == "5")
        );

        env::set_var("REC_MAX_LIMIT", "20");
        let config = Config::from_env().unwrap();
        assert_eq!(config.recommendation.max_limit, 20);

        clear_vars();
    }

    #[test]
    fn test_default_weights_are_valid() {
        assert!(RecommendationConfig::default().validate().is_ok());
    }
}
