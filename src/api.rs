use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tracing::{error, warn};

use crate::cache::{CacheRead, NewsCache};
use crate::error::NewsError;
use crate::ingest::config::{NewsConfig, MAX_DAYS};
use crate::ingest::extract::HtmlExtractor;
use crate::ingest::types::{AggregateResult, SourceError};
use crate::ingest::Aggregator;

pub const CACHE_HEADER: &str = "x-news-cache";
const ALL_CATEGORIES: &str = "all";

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<NewsCache>,
    pub default_days: u32,
}

impl AppState {
    pub fn new(cache: Arc<NewsCache>, default_days: u32) -> Self {
        Self {
            cache,
            default_days,
        }
    }

    /// Wire the real HTTP extractor behind the cache.
    pub fn from_config(cfg: &NewsConfig) -> anyhow::Result<Self> {
        let extractor = Arc::new(HtmlExtractor::new()?);
        let aggregator = Aggregator::new(cfg.sources.clone(), extractor);
        let cache = Arc::new(NewsCache::new(aggregator, cfg.ttl()));
        Ok(Self::new(cache, cfg.days))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/news", get(news))
        .route("/api/news/categories", get(categories))
        .route("/api/news/refresh", get(refresh))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<SourceError>>,
}

#[derive(Debug)]
pub enum ApiError {
    InvalidDays(String),
    News(NewsError),
}

impl From<NewsError> for ApiError {
    fn from(e: NewsError) -> Self {
        ApiError::News(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::InvalidDays(raw) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "invalid_days",
                    message: format!("days must be an integer between 1 and {MAX_DAYS}, got {raw:?}"),
                    errors: None,
                },
            ),
            ApiError::News(NewsError::AllSourcesFailed { result }) => {
                error!(failed = result.errors.as_ref().map_or(0, Vec::len), "all sources failed and no cached result");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorBody {
                        error: "all_sources_failed",
                        message: "every news source failed; retry later".to_string(),
                        errors: result.errors,
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Accepts plain digit strings in 1..=MAX_DAYS only; `u32::from_str` alone
/// would also take a leading `+`.
pub fn parse_days(raw: &str) -> Result<u32, ApiError> {
    let digits = raw.trim();
    Some(digits)
        .filter(|d| !d.is_empty() && d.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|d| d.parse::<u32>().ok())
        .filter(|d| (1..=MAX_DAYS).contains(d))
        .ok_or_else(|| ApiError::InvalidDays(raw.to_string()))
}

fn news_response(read: CacheRead, result: AggregateResult) -> Response {
    ([(CACHE_HEADER, read.status.as_str())], Json(result)).into_response()
}

async fn categories(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.cache.aggregator().categories())
}

async fn refresh(State(state): State<AppState>) -> Result<Response, ApiError> {
    let read = state.cache.get_or_refresh(true, state.default_days).await?;
    let result = read.result.as_ref().clone();
    Ok(news_response(read, result))
}

async fn news(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let days = match q.get("days") {
        Some(raw) => parse_days(raw).inspect_err(|_| warn!(days = %raw, "rejecting days parameter"))?,
        None => state.default_days,
    };

    let read = state.cache.get_or_refresh(false, days).await?;
    let result = match q.get("category").map(|c| c.trim()) {
        None | Some("") | Some(ALL_CATEGORIES) => read.result.as_ref().clone(),
        Some(category) => read.result.filtered_by_source(category),
    };
    Ok(news_response(read, result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn days_must_be_integer_in_range() {
        assert_eq!(parse_days("1").unwrap(), 1);
        assert_eq!(parse_days(" 90 ").unwrap(), 90);
        assert_eq!(parse_days("007").unwrap(), 7);
        for bad in ["0", "91", "-3", "+5", "7.5", "seven", "", "99999999999"] {
            assert!(parse_days(bad).is_err(), "{bad:?} should be rejected");
        }
    }
}
