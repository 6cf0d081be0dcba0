//! Page text extraction collaborator.
//!
//! The engine consumes extraction as an opaque operation: feed it a URL,
//! get plain text back. An empty string IS the failure signal; there is
//! no error contract. Content-location heuristics (finding the article
//! node, dropping boilerplate) belong to richer implementations behind
//! the same trait.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::warn;

use crate::fetch::html::strip_html;
use crate::{NewsHubError, Result};

/// User agent string for page fetching.
const USER_AGENT: &str = "Mozilla/5.0 (compatible; NewsHub/0.1)";

/// Extracts the readable text of a web page.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract plain text from the page at `url`.
    ///
    /// Returns an empty string on any failure.
    async fn extract_main_text(&self, url: &str) -> String;
}

/// Plain HTTP extractor: fetch the page, strip markup, normalize
/// whitespace.
pub struct HttpTextExtractor {
    client: Client,
}

impl HttpTextExtractor {
    /// Create an extractor with the given per-request timeout.
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| NewsHubError::Extract(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| NewsHubError::Extract(format!("failed to fetch page: {}", e)))?;

        if !response.status().is_success() {
            return Err(NewsHubError::Extract(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| NewsHubError::Extract(format!("failed to read page: {}", e)))?;

        Ok(strip_html(&body))
    }
}

#[async_trait]
impl TextExtractor for HttpTextExtractor {
    async fn extract_main_text(&self, url: &str) -> String {
        match self.fetch_text(url).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Text extraction failed for {}: {}", url, e);
                String::new()
            }
        }
    }
}
