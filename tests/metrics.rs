// tests/metrics.rs
//
// The Prometheus recorder is process-global, so everything that needs it
// lives in this one test.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::Local;
use tower::ServiceExt as _;

use news_aggregator::{
    Aggregator, AppState, NewsCache, NewsItem, SourceExtractor, SourceFetchError, SourceSpec,
};

struct OneFailsOneWorks;

#[async_trait]
impl SourceExtractor for OneFailsOneWorks {
    async fn extract(&self, spec: &SourceSpec) -> Result<Vec<NewsItem>, SourceFetchError> {
        if spec.title == "Broken" {
            return Err(SourceFetchError::new(&spec.title, "HTTP status 502 Bad Gateway"));
        }
        Ok(vec![NewsItem {
            source: spec.title.clone(),
            title: "hello".into(),
            url: format!("{}hello", spec.url),
            date: Local::now().date_naive(),
        }])
    }
}

fn spec(title: &str) -> SourceSpec {
    SourceSpec {
        title: title.into(),
        url: "https://example.test/".into(),
        item_selector: "li".into(),
        date_selector: "span".into(),
        title_selector: "a".into(),
        href_selector: "a".into(),
        headers: Default::default(),
    }
}

async fn body_text(app: &Router, uri: &str) -> (StatusCode, String) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn metrics_endpoint_exposes_ttl_and_aggregate_series() {
    let agg = Aggregator::new(vec![spec("Works"), spec("Broken")], Arc::new(OneFailsOneWorks));
    let cache = Arc::new(NewsCache::new(agg, Duration::from_secs(1800)));
    let app = news_aggregator::app(AppState::new(cache, 7), 1800);

    let (status, before) = body_text(&app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(before.contains("news_cache_ttl_secs"), "{before}");

    let (status, news) = body_text(&app, "/api/news").await;
    assert_eq!(status, StatusCode::OK);
    assert!(news.contains("\"partialSuccess\":true"), "{news}");

    let (_, after) = body_text(&app, "/metrics").await;
    assert!(after.contains("news_aggregate_items"), "{after}");
    assert!(after.contains("news_source_errors_total"), "{after}");
    assert!(after.contains("source=\"Broken\""), "{after}");

    body_text(&app, "/api/news").await;
    let (_, reads) = body_text(&app, "/metrics").await;
    assert!(reads.contains("news_cache_reads_total{status=\"MISS\"} 1"), "{reads}");
    assert!(reads.contains("news_cache_reads_total{status=\"HIT\"} 1"), "{reads}");
}
