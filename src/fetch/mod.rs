//! Feed fetching for NewsHub.
//!
//! Each selected source is retrieved and parsed independently: a hung or
//! broken feed contributes zero items to the cycle and never aborts the
//! pass. Sources are fetched concurrently through a bounded fan-out so a
//! full pass costs roughly the slowest single source.

pub mod html;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use feed_rs::parser;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::aggregator::types::{NewsItem, NO_DESCRIPTION, UNTITLED};
use crate::catalog::Source;
use crate::config::FetchConfig;
use crate::{NewsHubError, Result};

/// Connect timeout in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

/// User agent string for feed fetching.
const USER_AGENT: &str = "NewsHub/0.1 (RSS aggregator)";

/// Transport for retrieving raw feed content.
///
/// Abstracted so tests can feed canned XML through the real parse path.
#[async_trait]
pub trait FeedTransport: Send + Sync {
    /// Retrieve the raw bytes behind a feed endpoint.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// HTTP transport with per-request timeout and a redirect cap.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with the given total per-request timeout.
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS.min(timeout_secs)))
            .timeout(Duration::from_secs(timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| NewsHubError::Fetch(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FeedTransport for HttpTransport {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| NewsHubError::Fetch(format!("failed to fetch feed: {}", e)))?;

        if !response.status().is_success() {
            return Err(NewsHubError::Fetch(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| NewsHubError::Fetch(format!("failed to read response: {}", e)))?;

        Ok(bytes.to_vec())
    }
}

/// Result of one full fetch pass.
#[derive(Debug)]
pub struct FetchReport {
    /// Per-source item lists from sources that succeeded.
    pub lists: Vec<Vec<NewsItem>>,
    /// Number of sources attempted.
    pub attempted: usize,
    /// Number of sources that failed.
    pub failed: usize,
}

impl FetchReport {
    /// Number of sources that contributed items.
    pub fn succeeded(&self) -> usize {
        self.attempted - self.failed
    }

    /// Whether every attempted source failed.
    pub fn all_failed(&self) -> bool {
        self.attempted > 0 && self.failed == self.attempted
    }
}

/// Fetches and parses the feeds of selected sources.
pub struct FeedFetcher {
    transport: Arc<dyn FeedTransport>,
    max_entries_per_source: usize,
    concurrency: usize,
}

impl FeedFetcher {
    /// Create a fetcher over the given transport.
    pub fn new(transport: Arc<dyn FeedTransport>, config: &FetchConfig) -> Self {
        Self {
            transport,
            max_entries_per_source: config.max_entries_per_source,
            concurrency: config.concurrency.max(1),
        }
    }

    /// Fetch and parse a single source.
    pub async fn fetch_source(&self, source: &Source) -> Result<Vec<NewsItem>> {
        let bytes = self.transport.fetch(&source.url).await?;
        parse_entries(&bytes, source, self.max_entries_per_source)
    }

    /// Fetch all sources with bounded concurrency.
    ///
    /// Per-source failures are logged and isolated; the report says how
    /// many sources were attempted and how many failed.
    pub async fn fetch_all(&self, sources: &[Source]) -> FetchReport {
        // Build the lazy futures up front instead of mapping inside the
        // stream: a closure of type `fn(&Source) -> impl Future` trips
        // rustc's higher-ranked lifetime inference when the resulting
        // future is moved into `tokio::spawn`.
        let fetches: Vec<_> = sources
            .iter()
            .map(|source| async move { (source.id.clone(), self.fetch_source(source).await) })
            .collect();
        let results: Vec<(String, Result<Vec<NewsItem>>)> = stream::iter(fetches)
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut lists = Vec::new();
        let mut failed = 0;
        for (id, result) in results {
            match result {
                Ok(items) => {
                    debug!("Fetched {} item(s) from {}", items.len(), id);
                    lists.push(items);
                }
                Err(e) => {
                    warn!("Failed to fetch source {}: {}", id, e);
                    failed += 1;
                }
            }
        }

        FetchReport {
            lists,
            attempted: sources.len(),
            failed,
        }
    }
}

/// Parse feed bytes into items attributed to the given source.
///
/// At most `limit` entries are consumed. Missing titles and summaries get
/// placeholder text; markup is stripped to plain text.
fn parse_entries(bytes: &[u8], source: &Source, limit: usize) -> Result<Vec<NewsItem>> {
    let feed = parser::parse(bytes)
        .map_err(|e| NewsHubError::Fetch(format!("failed to parse feed: {}", e)))?;

    let items = feed
        .entries
        .into_iter()
        .take(limit)
        .map(|entry| {
            let link = entry.links.first().map(|l| l.href.clone());

            let guid = if !entry.id.is_empty() {
                entry.id
            } else if let Some(l) = &link {
                l.clone()
            } else {
                Uuid::new_v4().to_string()
            };
            // Link-less entries reuse the guid so both identity keys stay
            // distinct per entry
            let link = link.unwrap_or_else(|| guid.clone());

            let title = entry
                .title
                .map(|t| html::strip_html(&t.content))
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| UNTITLED.to_string());

            let summary = entry
                .summary
                .map(|t| t.content)
                .or(entry.content.and_then(|c| c.body))
                .map(|d| html::strip_html(&d))
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| NO_DESCRIPTION.to_string());

            let published_at = entry.published.or(entry.updated);

            NewsItem {
                guid,
                link,
                title,
                summary,
                published_at,
                source_id: source.id.clone(),
                source_name: source.display_name.clone(),
            }
        })
        .collect();

    Ok(items)
}
