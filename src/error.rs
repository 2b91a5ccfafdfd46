//! Error types for the aggregator.
//!
//! Failures are recovered at the narrowest scope: an [`ItemParseError`] drops
//! one element, a [`SourceFetchError`] drops one source, and only a
//! [`NewsError`] ever reaches the HTTP boundary.

use thiserror::Error;

use crate::ingest::types::AggregateResult;

/// A single source could not be fetched or its document could not be queried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("source '{source_title}' failed: {message}")]
pub struct SourceFetchError {
    /// Title of the failing `SourceSpec`.
    pub source_title: String,
    pub message: String,
}

impl SourceFetchError {
    pub fn new(source_title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source_title: source_title.into(),
            message: message.into(),
        }
    }
}

/// Why one matched item element was skipped. Never surfaced to callers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ItemParseError {
    #[error("no element matches the date selector")]
    MissingDate,

    #[error("unrecognised date text: {0:?}")]
    UnrecognisedDate(String),

    #[error("no element matches the title selector")]
    MissingTitle,

    #[error("no href found via the href selector")]
    MissingHref,

    #[error("href {href:?} cannot be resolved: {reason}")]
    InvalidHref { href: String, reason: String },
}

/// Errors that escape the aggregation core.
#[derive(Debug, Error)]
pub enum NewsError {
    /// Every configured source failed; the report is kept for the error body.
    #[error("all {} sources failed", failure_count(.result))]
    AllSourcesFailed { result: AggregateResult },
}

fn failure_count(result: &AggregateResult) -> usize {
    result.errors.as_ref().map_or(0, Vec::len)
}
