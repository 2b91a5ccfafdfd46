// src/ingest/mod.rs
pub mod config;
pub mod dates;
pub mod extract;
pub mod scheduler;
pub mod types;

use std::sync::Arc;

use chrono::{Local, NaiveDate, Utc};
use futures::future::join_all;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use tracing::{info, warn};

use crate::error::NewsError;
use crate::ingest::dates::within_window;
use crate::ingest::types::{AggregateResult, NewsItem, SourceError, SourceExtractor, SourceSpec};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "news_items_extracted_total",
            "Items successfully built from source documents."
        );
        describe_counter!(
            "news_items_skipped_total",
            "Matched item elements dropped as malformed."
        );
        describe_counter!(
            "news_source_errors_total",
            "Whole-source fetch failures, labelled by source."
        );
        describe_histogram!(
            "news_source_fetch_ms",
            "Fetch + parse time per source in milliseconds."
        );
        describe_gauge!(
            "news_aggregate_items",
            "Items in the most recent aggregate result."
        );
        describe_gauge!(
            "news_last_refresh_ts",
            "Unix ts when the aggregator last ran."
        );
    });
}

/// Timestamp format used for `updateTime`.
pub const UPDATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Stable sort newest-first, then keep only items inside the day window.
///
/// Ties keep their incoming order, which is source registry order.
pub fn sort_and_window(mut items: Vec<NewsItem>, today: NaiveDate, days: u32) -> Vec<NewsItem> {
    items.sort_by(|a, b| b.date.cmp(&a.date));
    items.retain(|it| within_window(it.date, today, days));
    items
}

/// Fans extraction out over the whole registry and merges the outcomes.
#[derive(Clone)]
pub struct Aggregator {
    sources: Arc<[SourceSpec]>,
    extractor: Arc<dyn SourceExtractor>,
}

impl Aggregator {
    pub fn new(sources: Vec<SourceSpec>, extractor: Arc<dyn SourceExtractor>) -> Self {
        Self {
            sources: sources.into(),
            extractor,
        }
    }

    /// Registry titles, in registry order.
    pub fn categories(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.title.clone()).collect()
    }

    /// Run every source against local today's window. Never fails; source
    /// failures end up in `errors`.
    pub async fn fetch_all(&self, days: u32) -> AggregateResult {
        self.fetch_all_on(days, Local::now().date_naive()).await
    }

    pub async fn fetch_all_on(&self, days: u32, today: NaiveDate) -> AggregateResult {
        ensure_metrics_described();

        // All futures are polled together; join_all waits for every one.
        let outcomes = join_all(self.sources.iter().map(|spec| self.extractor.extract(spec))).await;

        let mut merged = Vec::new();
        let mut errors = Vec::new();
        for (spec, outcome) in self.sources.iter().zip(outcomes) {
            match outcome {
                Ok(mut items) => merged.append(&mut items),
                Err(e) => {
                    warn!(source = %spec.title, error = %e.message, "source failed; continuing with the rest");
                    counter!("news_source_errors_total", "source" => spec.title.clone()).increment(1);
                    errors.push(SourceError::from_fetch_error(&e, Utc::now()));
                }
            }
        }

        let merged_count = merged.len();
        let items = sort_and_window(merged, today, days);
        let update_time = Local::now().format(UPDATE_TIME_FORMAT).to_string();
        let result = AggregateResult::build(items, errors, update_time);

        gauge!("news_aggregate_items").set(result.total as f64);
        gauge!("news_last_refresh_ts").set(Utc::now().timestamp() as f64);
        info!(
            target: "ingest",
            sources = self.sources.len(),
            merged = merged_count,
            kept = result.total,
            failed = result.errors.as_ref().map_or(0, Vec::len),
            days,
            "aggregate run finished"
        );
        result
    }

    /// [`fetch_all`](Self::fetch_all), escalating a total failure so the
    /// cache can fall back to its previous entry.
    pub async fn refresh(&self, days: u32) -> Result<AggregateResult, NewsError> {
        let result = self.fetch_all(days).await;
        if result.is_total_failure() {
            return Err(NewsError::AllSourcesFailed { result });
        }
        Ok(result)
    }
}
