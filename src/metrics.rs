//! Prometheus exposition for the aggregator.
//!
//! Ingest series are described lazily by the aggregator; the cache and
//! scheduler series are described here, once the recorder is installed.

use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and publish the cache TTL.
    pub fn init(ttl_secs: u64) -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new().install_recorder()?;

        describe_gauge!("news_cache_ttl_secs", "Configured cache TTL in seconds.");
        describe_counter!(
            "news_cache_reads_total",
            "Cache reads, labelled by status (HIT, MISS, FALLBACK)."
        );
        describe_counter!(
            "news_scheduler_ticks_total",
            "Background refresh ticks (only with NEWS_PREFETCH=1)."
        );
        gauge!("news_cache_ttl_secs").set(ttl_secs as f64);

        Ok(Self { handle })
    }

    /// `/metrics` in the Prometheus text format.
    pub fn router<S>(&self) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let handle = self.handle.clone();
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    }
}
