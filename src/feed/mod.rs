//! Feed Extraction
//!
//! Pulls the raw timestamp tokens of the first N listing items, in displayed
//! order. The page markup of the latest fetch is kept in a shared
//! `PageSession` so evidence capture can snapshot exactly what was checked.

pub mod listing;

pub use listing::*;

use std::fmt;

use async_trait::async_trait;

use crate::order_check::RawEntry;

/// The extractor could not produce a raw sequence at all.
#[derive(Debug)]
pub enum ExtractionError {
    /// Request never completed (DNS, connect, timeout, TLS)
    Request { url: String, source: reqwest::Error },
    /// Upstream answered with a non-success status
    Status { url: String, status: u16 },
    /// Response body could not be read
    Body { url: String, source: reqwest::Error },
}

impl fmt::Display for ExtractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request { url, source } => write!(f, "GET {} failed: {}", url, source),
            Self::Status { url, status } => write!(f, "GET {} returned {}", url, status),
            Self::Body { url, source } => write!(f, "Failed to read body of {}: {}", url, source),
        }
    }
}

impl std::error::Error for ExtractionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Request { source, .. } | Self::Body { source, .. } => Some(source),
            Self::Status { .. } => None,
        }
    }
}

/// Source of raw timestamp tokens for one cycle.
#[async_trait]
pub trait FeedExtractor: Send + Sync {
    /// Up to `limit` raw tokens in feed order. Fewer is not an error.
    async fn extract(&self, limit: usize) -> Result<Vec<RawEntry>, ExtractionError>;
}
