// src/ingest/types.rs
use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SourceFetchError;

/// One scrapeable source and the selectors used to pull items out of it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SourceSpec {
    /// Unique; doubles as category key and error attribution key.
    pub title: String,
    pub url: String,
    pub item_selector: String,
    pub date_selector: String,
    pub title_selector: String,
    pub href_selector: String,
    /// Per-source header overrides, merged over the extractor defaults.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewsItem {
    pub source: String, // owning SourceSpec.title
    pub title: String,
    pub url: String,     // absolute
    pub date: NaiveDate, // serialised as YYYY-MM-DD
}

/// A whole-source failure recorded in an aggregate report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceError {
    pub source: String,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

impl SourceError {
    pub fn from_fetch_error(err: &SourceFetchError, at: DateTime<Utc>) -> Self {
        Self {
            source: err.source_title.clone(),
            error: err.message.clone(),
            timestamp: at,
        }
    }
}

/// Output of one aggregation run.
///
/// `errors` and `partial_success` are `None` when no source failed, and are
/// then left out of the JSON entirely (an empty `errors` array would mean
/// something else to consumers).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    pub update_time: String,
    pub total: usize,
    pub all_items: Vec<NewsItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<SourceError>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_success: Option<bool>,
}

impl AggregateResult {
    pub fn build(items: Vec<NewsItem>, errors: Vec<SourceError>, update_time: String) -> Self {
        let total = items.len();
        let (errors, partial_success) = if errors.is_empty() {
            (None, None)
        } else {
            (Some(errors), Some(total > 0))
        };
        Self {
            update_time,
            total,
            all_items: items,
            errors,
            partial_success,
        }
    }

    /// At least one source failed and nothing usable came back.
    pub fn is_total_failure(&self) -> bool {
        self.errors.as_ref().is_some_and(|e| !e.is_empty()) && self.total == 0
    }

    /// Copy restricted to one source, `total` recomputed. The error report
    /// is carried over untouched.
    pub fn filtered_by_source(&self, source: &str) -> Self {
        let all_items: Vec<NewsItem> = self
            .all_items
            .iter()
            .filter(|it| it.source == source)
            .cloned()
            .collect();
        Self {
            update_time: self.update_time.clone(),
            total: all_items.len(),
            all_items,
            errors: self.errors.clone(),
            partial_success: self.partial_success,
        }
    }
}

#[async_trait::async_trait]
pub trait SourceExtractor: Send + Sync {
    /// Fetch one source and return its items. Malformed items are skipped;
    /// only a source-level failure is an error.
    async fn extract(&self, spec: &SourceSpec) -> Result<Vec<NewsItem>, SourceFetchError>;
}
