// src/ingest/config.rs
use anyhow::{anyhow, bail, Context, Result};
use scraper::Selector;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

use crate::ingest::types::SourceSpec;

pub const ENV_CONFIG_PATH: &str = "NEWS_CONFIG_PATH";
pub const DEFAULT_TOML_PATH: &str = "config/news.toml";
pub const DEFAULT_JSON_PATH: &str = "config/news.json";

/// Window used when the config is unusable.
pub const FALLBACK_DAYS: u32 = 7;
pub const FALLBACK_INTERVAL_MINUTES: u64 = 30;
pub const MAX_DAYS: u32 = 90;

/// Validated service configuration: defaults plus the source registry.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewsConfig {
    pub days: u32,
    pub interval_minutes: u64,
    pub sources: Vec<SourceSpec>,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            days: FALLBACK_DAYS,
            interval_minutes: FALLBACK_INTERVAL_MINUTES,
            sources: Vec::new(),
        }
    }
}

impl NewsConfig {
    /// Cache TTL; same as the refresh interval.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.saturating_mul(60))
    }

    /// Load from an explicit path (TOML or JSON) and validate.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading news config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg = parse_config(&content, ext.as_str())
            .with_context(|| format!("parsing news config {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Resolve the config path:
    /// 1) $NEWS_CONFIG_PATH
    /// 2) config/news.toml
    /// 3) config/news.json
    pub fn locate() -> Result<PathBuf> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Ok(pb);
            }
            bail!("{ENV_CONFIG_PATH} points to non-existent path {}", pb.display());
        }
        [DEFAULT_TOML_PATH, DEFAULT_JSON_PATH]
            .into_iter()
            .map(PathBuf::from)
            .find(|p| p.exists())
            .ok_or_else(|| anyhow!("no news config found ({DEFAULT_TOML_PATH}, {DEFAULT_JSON_PATH})"))
    }

    /// Never fails: any problem is logged and the safe default is used, so
    /// the service still starts (and serves an empty result).
    pub fn load_or_default() -> Self {
        match Self::locate().and_then(|p| Self::load_from(&p)) {
            Ok(cfg) => {
                info!(
                    sources = cfg.sources.len(),
                    days = cfg.days,
                    interval_minutes = cfg.interval_minutes,
                    "news config loaded"
                );
                cfg
            }
            Err(e) => {
                warn!(error = ?e, "news config unusable; falling back to empty registry");
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_DAYS).contains(&self.days) {
            bail!("days must be within 1..={MAX_DAYS}, got {}", self.days);
        }
        if self.interval_minutes == 0 {
            bail!("intervalMinutes must be at least 1");
        }
        let mut seen = HashSet::new();
        for (i, s) in self.sources.iter().enumerate() {
            validate_source(s).with_context(|| format!("sources[{i}] ({:?})", s.title))?;
            if !seen.insert(s.title.as_str()) {
                bail!("duplicate source title {:?}", s.title);
            }
        }
        Ok(())
    }
}

fn validate_source(s: &SourceSpec) -> Result<()> {
    let required = [
        ("title", &s.title),
        ("url", &s.url),
        ("itemSelector", &s.item_selector),
        ("dateSelector", &s.date_selector),
        ("titleSelector", &s.title_selector),
        ("hrefSelector", &s.href_selector),
    ];
    for (name, value) in required {
        if value.trim().is_empty() {
            bail!("{name} is empty");
        }
    }

    let url = Url::parse(&s.url).with_context(|| format!("url {:?}", s.url))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("url scheme must be http or https, got {}", url.scheme());
    }

    for (name, raw) in &required[2..] {
        Selector::parse(raw).map_err(|e| anyhow!("{name} {raw:?} does not compile: {e}"))?;
    }
    Ok(())
}

fn parse_config(s: &str, hint_ext: &str) -> Result<NewsConfig> {
    if hint_ext == "toml" {
        return toml::from_str(s).map_err(Into::into);
    }
    if hint_ext == "json" {
        return serde_json::from_str(s).map_err(Into::into);
    }
    // Unknown extension: JSON first, then TOML.
    serde_json::from_str(s).or_else(|_| toml::from_str(s).map_err(Into::into))
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON: &str = r#"{
        "days": 14,
        "intervalMinutes": 15,
        "sources": [
          { "title": "Campus", "url": "https://news.example.edu/",
            "itemSelector": "li", "dateSelector": ".date",
            "titleSelector": "a", "hrefSelector": "a",
            "headers": { "Referer": "https://news.example.edu/" } }
        ]
    }"#;

    #[test]
    fn parses_json_with_camel_case_keys() {
        let cfg = parse_config(JSON, "json").unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.days, 14);
        assert_eq!(cfg.ttl(), Duration::from_secs(15 * 60));
        assert_eq!(cfg.sources[0].headers.len(), 1);
    }

    #[test]
    fn parses_toml() {
        let toml = r#"
days = 3
intervalMinutes = 30

[[sources]]
title = "Campus"
url = "https://news.example.edu/"
itemSelector = "li"
dateSelector = ".date"
titleSelector = "a"
hrefSelector = "a"
"#;
        let cfg = parse_config(toml, "toml").unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.sources.len(), 1);
        assert!(cfg.sources[0].headers.is_empty());
    }

    #[test]
    fn missing_required_field_is_a_parse_error() {
        let broken = r#"{ "days": 7, "sources": [] }"#;
        assert!(parse_config(broken, "json").is_err());
    }

    #[test]
    fn validation_rejects_bad_sources() {
        let mut cfg = parse_config(JSON, "json").unwrap();
        cfg.sources.push(cfg.sources[0].clone());
        assert!(cfg.validate().is_err(), "duplicate titles");

        let mut cfg = parse_config(JSON, "json").unwrap();
        cfg.sources[0].item_selector = "li[".into();
        assert!(cfg.validate().is_err(), "bad selector");

        let mut cfg = parse_config(JSON, "json").unwrap();
        cfg.sources[0].url = "ftp://example.edu/".into();
        assert!(cfg.validate().is_err(), "non-http url");

        let mut cfg = parse_config(JSON, "json").unwrap();
        cfg.days = 91;
        assert!(cfg.validate().is_err(), "days out of range");
    }

    #[test]
    fn default_is_empty_and_conservative() {
        let cfg = NewsConfig::default();
        assert!(cfg.sources.is_empty());
        assert_eq!(cfg.days, FALLBACK_DAYS);
        assert!(cfg.validate().is_ok());
    }
}
