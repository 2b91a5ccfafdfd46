// src/lib.rs
// Public library surface for integration tests (and the binary).

pub mod api;
pub mod cache;
pub mod error;
pub mod ingest;
pub mod metrics;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::cache::{CacheStatus, NewsCache};
pub use crate::error::{NewsError, SourceFetchError};
pub use crate::ingest::config::NewsConfig;
pub use crate::ingest::types::{AggregateResult, NewsItem, SourceError, SourceExtractor, SourceSpec};
pub use crate::ingest::Aggregator;

use axum::Router;
use tracing::warn;

/// Full application router: news API plus `/metrics` when a Prometheus
/// recorder could be installed.
pub fn app(state: AppState, ttl_secs: u64) -> Router {
    let router = api::router(state);
    match metrics::Metrics::init(ttl_secs) {
        Ok(m) => router.merge(m.router()),
        Err(e) => {
            warn!(error = ?e, "metrics recorder unavailable; /metrics disabled");
            router
        }
    }
}
