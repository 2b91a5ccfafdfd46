//! News Aggregator: binary entrypoint
//! Loads the source registry, wires the cache and routes, and hands the
//! Axum router to the Shuttle runtime.

use std::sync::Arc;

use news_aggregator::AppState;
use news_aggregator::ingest::scheduler::{spawn_refresh_scheduler, RefreshSchedulerCfg};
use news_aggregator::NewsConfig;
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Enable compact tracing logs when NEWS_DEV_LOG=1.
fn enable_dev_tracing() {
    let dev_flag = std::env::var("NEWS_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");
    if !dev_flag {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("news_aggregator=info,ingest=info,warn"));

    // The runtime may already have installed a subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    // Unusable config falls back to an empty registry instead of aborting.
    let cfg = NewsConfig::load_or_default();
    let state = AppState::from_config(&cfg)?;

    if std::env::var("NEWS_PREFETCH").ok().as_deref() == Some("1") {
        spawn_refresh_scheduler(
            Arc::clone(&state.cache),
            RefreshSchedulerCfg {
                interval: cfg.ttl(),
                days: cfg.days,
            },
        );
    }

    let router = news_aggregator::app(state, cfg.ttl().as_secs());
    Ok(router.into())
}
