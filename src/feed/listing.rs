//! Listing Page Extractor
//!
//! Each feed item is a `<tr class="athing">` row followed by a subtext row
//! whose `<span class="age" title="...">` carries the item's timestamp.
//! An item without an age span yields an absent entry rather than being
//! dropped, so positions stay aligned with what is displayed.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use lazy_static::lazy_static;
use parking_lot::RwLock;
use regex::Regex;
use reqwest::Client;
use tracing::{debug, info, warn};

use super::{ExtractionError, FeedExtractor};
use crate::config::MonitorConfig;
use crate::order_check::RawEntry;

lazy_static! {
    static ref ITEM_ROW: Regex =
        Regex::new(r#"<tr\b[^>]*\bclass\s*=\s*"[^"]*\bathing\b[^"]*""#).unwrap();
    static ref AGE_SPAN: Regex =
        Regex::new(r#"<span\b[^>]*\bclass\s*=\s*"[^"]*\bage\b[^"]*"[^>]*>"#).unwrap();
    static ref TITLE_ATTR: Regex = Regex::new(r#"\btitle\s*=\s*"([^"]*)""#).unwrap();
}

/// Page markup as observed by the most recent fetch.
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    pub url: String,
    pub fetched_at: DateTime<Local>,
    pub markup: String,
}

/// Shared view of the page the current cycle is looking at.
#[derive(Debug, Default)]
pub struct PageSession {
    latest: RwLock<Option<PageSnapshot>>,
}

impl PageSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> Option<PageSnapshot> {
        self.latest.read().clone()
    }

    pub fn store(&self, snapshot: PageSnapshot) {
        *self.latest.write() = Some(snapshot);
    }

    pub fn clear(&self) {
        *self.latest.write() = None;
    }
}

/// Fetches the listing page over HTTP and scrapes item ages.
pub struct ListingExtractor {
    client: Client,
    url: String,
    session: Arc<PageSession>,
}

impl ListingExtractor {
    pub fn new(config: &MonitorConfig, session: Arc<PageSession>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(config.user_agent.clone())
            .build()
            .context("Failed to build listing HTTP client")?;

        Ok(Self {
            client,
            url: config.feed_url.clone(),
            session,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl FeedExtractor for ListingExtractor {
    async fn extract(&self, limit: usize) -> Result<Vec<RawEntry>, ExtractionError> {
        // a failed fetch must not leave the previous cycle's page around as evidence
        self.session.clear();

        debug!("Fetching listing {}", self.url);
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|source| ExtractionError::Request {
                url: self.url.clone(),
                source,
            })?;

        if !resp.status().is_success() {
            return Err(ExtractionError::Status {
                url: self.url.clone(),
                status: resp.status().as_u16(),
            });
        }

        let markup = resp.text().await.map_err(|source| ExtractionError::Body {
            url: self.url.clone(),
            source,
        })?;

        let entries = extract_ages(&markup, limit);
        if entries.is_empty() {
            warn!("No feed items found on {}", self.url);
        } else {
            info!("Extracted {} timestamps from {}", entries.len(), self.url);
        }

        self.session.store(PageSnapshot {
            url: self.url.clone(),
            fetched_at: Local::now(),
            markup,
        });

        Ok(entries)
    }
}

/// Scrape the age `title` of the first `limit` items, in page order.
pub fn extract_ages(markup: &str, limit: usize) -> Vec<RawEntry> {
    let starts: Vec<usize> = ITEM_ROW.find_iter(markup).map(|m| m.start()).collect();

    starts
        .iter()
        .enumerate()
        .take(limit)
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(markup.len());
            age_title(&markup[start..end])
        })
        .collect()
}

fn age_title(item: &str) -> RawEntry {
    let span = AGE_SPAN.find(item)?;
    TITLE_ATTR
        .captures(span.as_str())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
