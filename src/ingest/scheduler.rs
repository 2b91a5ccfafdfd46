// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::cache::NewsCache;

#[derive(Clone, Copy, Debug)]
pub struct RefreshSchedulerCfg {
    pub interval: Duration,
    pub days: u32,
}

/// Keep the cache warm: every tick forces a refresh, so the slot is replaced
/// once per TTL period. Failures are logged and the next tick carries on;
/// there is no retry in between.
pub fn spawn_refresh_scheduler(cache: Arc<NewsCache>, cfg: RefreshSchedulerCfg) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(cfg.interval.max(Duration::from_secs(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            counter!("news_scheduler_ticks_total").increment(1);
            match cache.get_or_refresh(true, cfg.days).await {
                Ok(read) => tracing::info!(
                    target: "ingest",
                    status = read.status.as_str(),
                    total = read.result.total,
                    "scheduled refresh tick"
                ),
                Err(e) => tracing::warn!(target: "ingest", error = %e, "scheduled refresh failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::{NewsItem, SourceExtractor, SourceSpec};
    use crate::ingest::Aggregator;
    use crate::error::SourceFetchError;
    use async_trait::async_trait;
    use chrono::Local;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Nothing;

    /// Takes 50 ms per fetch and counts calls.
    struct Slow {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SourceExtractor for Slow {
        async fn extract(&self, spec: &SourceSpec) -> Result<Vec<NewsItem>, SourceFetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(vec![NewsItem {
                source: spec.title.clone(),
                title: "tick".into(),
                url: spec.url.clone(),
                date: Local::now().date_naive(),
            }])
        }
    }

    #[async_trait]
    impl SourceExtractor for Nothing {
        async fn extract(&self, _spec: &SourceSpec) -> Result<Vec<NewsItem>, SourceFetchError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn first_tick_fills_the_cache() {
        let cache = Arc::new(NewsCache::new(
            Aggregator::new(vec![], Arc::new(Nothing)),
            Duration::from_secs(60),
        ));
        let handle = spawn_refresh_scheduler(
            Arc::clone(&cache),
            RefreshSchedulerCfg {
                interval: Duration::from_secs(3600),
                days: 7,
            },
        );

        for _ in 0..50 {
            if cache.peek().is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();
        assert!(cache.peek().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn every_tick_refreshes_when_interval_equals_ttl() {
        let slow = Arc::new(Slow {
            calls: AtomicUsize::new(0),
        });
        let spec = SourceSpec {
            title: "A".into(),
            url: "https://a.test/".into(),
            item_selector: "li".into(),
            date_selector: "span".into(),
            title_selector: "a".into(),
            href_selector: "a".into(),
            headers: Default::default(),
        };
        let period = Duration::from_secs(1);
        let cache = Arc::new(NewsCache::new(
            Aggregator::new(vec![spec], slow.clone()),
            period,
        ));
        let handle = spawn_refresh_scheduler(
            Arc::clone(&cache),
            RefreshSchedulerCfg {
                interval: period,
                days: 7,
            },
        );

        // Ticks at 0s..=5s.
        tokio::time::sleep(Duration::from_millis(5_500)).await;
        handle.abort();
        assert_eq!(slow.calls.load(Ordering::SeqCst), 6);
        assert_eq!(cache.peek().unwrap().result.total, 1);
    }
}
