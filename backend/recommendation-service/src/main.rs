use anyhow::Context;
use recommendation_service::jobs::{start_cache_warmer, start_model_refresher};
use recommendation_service::{Config, InMemoryStore, RecommendationService, Snapshot};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,recommendation_service=debug"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::from_env().context("Failed to load config")?;
    info!(
        service = %config.service.service_name,
        env = %config.service.env,
        "Starting recommendation worker"
    );

    let store = match &config.service.snapshot_path {
        Some(path) => {
            let snapshot = Snapshot::load(path)
                .with_context(|| format!("Failed to load snapshot from {}", path))?;
            Arc::new(InMemoryStore::from_snapshot(snapshot))
        }
        None => {
            warn!("SNAPSHOT_PATH not set, starting with an empty store");
            Arc::new(InMemoryStore::new())
        }
    };

    let service = RecommendationService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        config.recommendation.clone(),
    )
    .context("Failed to build recommendation service")?;

    // Initial popular snapshot; later rebuilds come from the refresher
    match service.rebuild_model().await {
        Ok(popular_count) => info!(popular_count, "Initial model build completed"),
        Err(e) => warn!(error = %e, "Initial model build failed, will retry on refresh"),
    }

    tokio::spawn(start_model_refresher(
        service.clone(),
        (&config.recommendation).into(),
    ));
    tokio::spawn(start_cache_warmer(
        service.clone(),
        store.clone(),
        config.cache_warmer.clone(),
    ));

    info!("Recommendation worker running, press Ctrl+C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received, stopping recommendation worker");

    Ok(())
}
