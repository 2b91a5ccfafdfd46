// src/ingest/extract.rs
//! HTML extractor: one GET per source, selector-driven item parsing.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{ItemParseError, SourceFetchError};
use crate::ingest::dates::parse_item_date;
use crate::ingest::types::{NewsItem, SourceExtractor, SourceSpec};

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const MAX_REDIRECTS: usize = 5;
const USER_AGENT: &str = concat!("news-aggregator/", env!("CARGO_PKG_VERSION"));

/// Compiled selector set for one source.
struct Selectors {
    item: Selector,
    date: Selector,
    title: Selector,
    href: Selector,
}

impl Selectors {
    fn compile(spec: &SourceSpec) -> Result<Self, SourceFetchError> {
        let parse = |what: &str, raw: &str| {
            Selector::parse(raw).map_err(|e| {
                SourceFetchError::new(&spec.title, format!("invalid {what} selector {raw:?}: {e}"))
            })
        };
        Ok(Self {
            item: parse("item", &spec.item_selector)?,
            date: parse("date", &spec.date_selector)?,
            title: parse("title", &spec.title_selector)?,
            href: parse("href", &spec.href_selector)?,
        })
    }
}

/// Parse an already-fetched document into items.
///
/// Fails only when the source itself is unusable (bad base URL or
/// selectors). Elements that cannot be turned into an item are skipped.
pub fn parse_document(spec: &SourceSpec, html: &str) -> Result<Vec<NewsItem>, SourceFetchError> {
    let base = Url::parse(&spec.url)
        .map_err(|e| SourceFetchError::new(&spec.title, format!("invalid source url: {e}")))?;
    let sel = Selectors::compile(spec)?;
    let document = Html::parse_document(html);

    let mut out = Vec::new();
    let mut skipped = 0usize;
    for element in document.select(&sel.item) {
        match parse_item(spec, &base, &sel, element) {
            Ok(item) => out.push(item),
            Err(e) => {
                skipped += 1;
                debug!(source = %spec.title, error = %e, "skipping item");
            }
        }
    }

    counter!("news_items_extracted_total").increment(out.len() as u64);
    counter!("news_items_skipped_total").increment(skipped as u64);
    Ok(out)
}

fn parse_item(
    spec: &SourceSpec,
    base: &Url,
    sel: &Selectors,
    element: ElementRef<'_>,
) -> Result<NewsItem, ItemParseError> {
    let date_el = element
        .select(&sel.date)
        .next()
        .ok_or(ItemParseError::MissingDate)?;
    let date_text = collapse_text(date_el);
    let date =
        parse_item_date(&date_text).ok_or(ItemParseError::UnrecognisedDate(date_text))?;

    let title_el = element
        .select(&sel.title)
        .next()
        .ok_or(ItemParseError::MissingTitle)?;
    let href = element
        .select(&sel.href)
        .next()
        .and_then(|a| a.value().attr("href"))
        .ok_or(ItemParseError::MissingHref)?;

    let url = base
        .join(href.trim())
        .map_err(|e| ItemParseError::InvalidHref {
            href: href.to_string(),
            reason: e.to_string(),
        })?;

    let title = title_el
        .value()
        .attr("title")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| title_el.text().collect::<String>().trim().to_string());

    Ok(NewsItem {
        source: spec.title.clone(),
        title,
        url: url.to_string(),
        date,
    })
}

/// Element text with whitespace runs collapsed and ends trimmed. Dates only;
/// titles keep their inner spacing.
fn collapse_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn header_overrides(spec: &SourceSpec) -> Result<HeaderMap, SourceFetchError> {
    let mut map = HeaderMap::with_capacity(spec.headers.len());
    for (k, v) in &spec.headers {
        let name = HeaderName::from_bytes(k.as_bytes())
            .map_err(|e| SourceFetchError::new(&spec.title, format!("invalid header {k:?}: {e}")))?;
        let value = HeaderValue::from_str(v).map_err(|e| {
            SourceFetchError::new(&spec.title, format!("invalid value for header {k:?}: {e}"))
        })?;
        map.insert(name, value);
    }
    Ok(map)
}

/// Fetches sources over HTTP and parses them with [`parse_document`].
#[derive(Clone)]
pub struct HtmlExtractor {
    client: reqwest::Client,
    timeout: Duration,
}

impl HtmlExtractor {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_timeout(FETCH_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            // Certificate validation is off for every source.
            .danger_accept_invalid_certs(true)
            .build()?;
        Ok(Self { client, timeout })
    }

    async fn fetch_body(&self, spec: &SourceSpec) -> Result<String, SourceFetchError> {
        let headers = header_overrides(spec)?;
        let resp = self
            .client
            .get(&spec.url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| SourceFetchError::new(&spec.title, self.describe(&e)))?;

        let status = resp.status();
        if status.as_u16() >= 400 {
            return Err(SourceFetchError::new(
                &spec.title,
                format!("HTTP status {status}"),
            ));
        }
        resp.text()
            .await
            .map_err(|e| SourceFetchError::new(&spec.title, self.describe(&e)))
    }

    fn describe(&self, e: &reqwest::Error) -> String {
        if e.is_timeout() {
            format!("request timed out after {:?}", self.timeout)
        } else if e.is_redirect() {
            format!("too many redirects (limit {MAX_REDIRECTS})")
        } else {
            e.to_string()
        }
    }
}

#[async_trait]
impl SourceExtractor for HtmlExtractor {
    async fn extract(&self, spec: &SourceSpec) -> Result<Vec<NewsItem>, SourceFetchError> {
        let t0 = Instant::now();
        let body = match self.fetch_body(spec).await {
            Ok(b) => b,
            Err(e) => {
                warn!(source = %spec.title, url = %spec.url, error = %e.message, "source fetch failed");
                return Err(e);
            }
        };
        let items = parse_document(spec, &body)?;

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("news_source_fetch_ms").record(ms);
        info!(source = %spec.title, items = items.len(), ms, "source extracted");
        Ok(items)
    }
}
