//! # News Cache
//! Single-slot, TTL-bounded cache in front of the [`Aggregator`].
//!
//! - Fresh reads return the stored result as-is, whatever `days` the caller
//!   asks for; the window only changes on expiry or a forced refresh.
//! - Every completed refresh overwrites the slot, partial failures included.
//! - A failed refresh falls back to the previous entry when there is one.
//!
//! The slot lock is only held to read or swap the entry, never across a
//! fetch, so concurrent refreshes are last-writer-wins.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use metrics::counter;
use tracing::{debug, warn};

use crate::error::NewsError;
use crate::ingest::types::AggregateResult;
use crate::ingest::Aggregator;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub result: Arc<AggregateResult>,
    pub stored_at: Instant,
}

/// How a read was served; exposed to clients as `X-News-Cache`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
    Fallback,
}

impl CacheStatus {
    fn record(self) -> Self {
        counter!("news_cache_reads_total", "status" => self.as_str()).increment(1);
        self
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
            CacheStatus::Fallback => "FALLBACK",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheRead {
    pub result: Arc<AggregateResult>,
    pub status: CacheStatus,
}

pub struct NewsCache {
    aggregator: Aggregator,
    ttl: Duration,
    slot: Mutex<Option<CacheEntry>>,
}

impl NewsCache {
    pub fn new(aggregator: Aggregator, ttl: Duration) -> Self {
        Self {
            aggregator,
            ttl,
            slot: Mutex::new(None),
        }
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Current entry, without refreshing.
    pub fn peek(&self) -> Option<CacheEntry> {
        self.lock().clone()
    }

    pub async fn get_or_refresh(&self, force: bool, days: u32) -> Result<CacheRead, NewsError> {
        let previous = self.peek();

        if !force {
            if let Some(entry) = &previous {
                if entry.stored_at.elapsed() < self.ttl {
                    debug!(days, "news cache hit");
                    return Ok(CacheRead {
                        result: Arc::clone(&entry.result),
                        status: CacheStatus::Hit.record(),
                    });
                }
            }
        }

        match self.aggregator.refresh(days).await {
            Ok(result) => {
                let result = Arc::new(result);
                *self.lock() = Some(CacheEntry {
                    result: Arc::clone(&result),
                    stored_at: Instant::now(),
                });
                Ok(CacheRead {
                    result,
                    status: CacheStatus::Miss.record(),
                })
            }
            Err(e) => match previous {
                Some(entry) => {
                    warn!(error = %e, force, "refresh failed; serving previous result");
                    Ok(CacheRead {
                        result: entry.result,
                        status: CacheStatus::Fallback.record(),
                    })
                }
                None => Err(e),
            },
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<CacheEntry>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
