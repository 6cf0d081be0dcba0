//! Core aggregation types for NewsHub.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::SavedArticle;

/// Placeholder title for entries that carry none.
pub const UNTITLED: &str = "untitled";

/// Placeholder summary for entries that carry none.
pub const NO_DESCRIPTION: &str = "no description";

/// One normalized entry retrieved from a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    /// Feed-provided identifier, or a fallback (link, then generated token).
    pub guid: String,
    /// Link to the original article.
    pub link: String,
    /// Item title, plain text.
    pub title: String,
    /// Item summary, plain text.
    pub summary: String,
    /// When the item was published, if the source provided it.
    pub published_at: Option<DateTime<Utc>>,
    /// Id of the source the item came from.
    pub source_id: String,
    /// Display name of the source the item came from.
    pub source_name: String,
}

impl NewsItem {
    /// Fingerprint used for seen-tracking: link and title concatenated.
    ///
    /// Deliberately unhashed; two computations agree only on an exact
    /// match including whitespace.
    pub fn fingerprint(&self) -> String {
        format!("{}{}", self.link, self.title)
    }
}

/// Sort key for the merged list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Publication date, newest first, undated items last.
    #[default]
    Date,
    /// Title, ascending, case-insensitive.
    Title,
    /// Source display name, ascending, case-insensitive.
    SourceName,
}

impl SortKey {
    /// Parse a sort key from its query-string form.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "date" => Some(SortKey::Date),
            "title" => Some(SortKey::Title),
            "source" => Some(SortKey::SourceName),
            _ => None,
        }
    }
}

/// The current merged item list plus its refresh timestamp.
#[derive(Debug, Clone, Default)]
pub struct AggregationCache {
    /// Deduplicated, sorted, capped item list.
    pub items: Vec<NewsItem>,
    /// When the last successful refresh completed.
    pub last_refresh_at: Option<DateTime<Utc>>,
}

impl AggregationCache {
    /// Seconds remaining until the refresh gate opens, or `None` if the
    /// cache is already stale.
    pub fn seconds_until_refresh(&self, interval_secs: u64, now: DateTime<Utc>) -> Option<u64> {
        let last = self.last_refresh_at?;
        let elapsed = now.signed_duration_since(last).num_seconds();
        if elapsed < 0 {
            return Some(interval_secs);
        }
        let elapsed = elapsed as u64;
        if elapsed < interval_secs {
            Some(interval_secs - elapsed)
        } else {
            None
        }
    }
}

/// Result of a refresh request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The cache was replaced with a freshly merged list.
    Refreshed {
        /// Number of items in the new list.
        items: usize,
        /// Number of sources that contributed successfully.
        sources: usize,
    },
    /// The refresh gate is still closed; no fetch was attempted.
    Throttled {
        /// Seconds until the gate opens.
        seconds_remaining: u64,
    },
    /// No source could be fetched; the previous cache was retained.
    Failed {
        /// Short user-facing reason.
        reason: String,
    },
}

impl RefreshOutcome {
    /// Whether the cache was actually replaced.
    pub fn is_refreshed(&self) -> bool {
        matches!(self, RefreshOutcome::Refreshed { .. })
    }
}

/// Result of an archive request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveOutcome {
    /// The article was extracted and persisted.
    Saved(SavedArticle),
    /// The link is already in the archive; nothing was written.
    AlreadySaved,
    /// The link is not present in the current cache.
    NotFound,
    /// Text extraction returned nothing; no record was persisted.
    ExtractionFailed,
}

impl ArchiveOutcome {
    /// Whether a new record was persisted.
    pub fn accepted(&self) -> bool {
        matches!(self, ArchiveOutcome::Saved(_))
    }

    /// Short user-facing reason string.
    pub fn reason(&self) -> &'static str {
        match self {
            ArchiveOutcome::Saved(_) => "saved",
            ArchiveOutcome::AlreadySaved => "already saved",
            ArchiveOutcome::NotFound => "article not found in current cache",
            ArchiveOutcome::ExtractionFailed => "failed to extract article text",
        }
    }
}

/// One page of a paginated result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// 1-indexed page number, clamped into range.
    pub page: usize,
    /// Page size the result was computed with.
    pub page_size: usize,
    /// Total number of items across all pages.
    pub total_items: usize,
    /// Total number of pages, at least 1.
    pub total_pages: usize,
}

/// Parameters for the main item listing.
#[derive(Debug, Clone)]
pub struct PageQuery {
    /// 1-indexed page number.
    pub page: usize,
    /// Sort key.
    pub sort: SortKey,
    /// Optional source id filter.
    pub source: Option<String>,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: 1,
            sort: SortKey::default(),
            source: None,
        }
    }
}

/// Item count for one source, keyed by display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCount {
    /// Source display name.
    pub name: String,
    /// Number of cached items from the source.
    pub count: usize,
}

/// Aggregate statistics over the current cache.
#[derive(Debug, Clone)]
pub struct AggregateStats {
    /// Total number of cached items.
    pub total_items: usize,
    /// Number of distinct sources present in the cache.
    pub distinct_sources: usize,
    /// Number of sources in the persisted selection.
    pub selected_sources: usize,
    /// Number of cached items not yet seen.
    pub new_count: usize,
    /// When the last successful refresh completed.
    pub last_refresh_at: Option<DateTime<Utc>>,
    /// Per-source counts, descending, capped for display.
    pub by_source: Vec<SourceCount>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn item(link: &str, title: &str) -> NewsItem {
        NewsItem {
            guid: link.to_string(),
            link: link.to_string(),
            title: title.to_string(),
            summary: String::new(),
            published_at: None,
            source_id: "test".to_string(),
            source_name: "Test".to_string(),
        }
    }

    #[test]
    fn test_fingerprint_is_exact_concatenation() {
        let a = item("https://e.com/1", "Title");
        assert_eq!(a.fingerprint(), "https://e.com/1Title");

        // Whitespace differences produce different fingerprints
        let b = item("https://e.com/1", "Title ");
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_sort_key_parse() {
        assert_eq!(SortKey::parse("date"), Some(SortKey::Date));
        assert_eq!(SortKey::parse("title"), Some(SortKey::Title));
        assert_eq!(SortKey::parse("source"), Some(SortKey::SourceName));
        assert_eq!(SortKey::parse("bogus"), None);
    }

    #[test]
    fn test_cache_never_refreshed_is_stale() {
        let cache = AggregationCache::default();
        assert_eq!(cache.seconds_until_refresh(300, Utc::now()), None);
    }

    #[test]
    fn test_cache_fresh_reports_remaining() {
        let now = Utc::now();
        let cache = AggregationCache {
            items: Vec::new(),
            last_refresh_at: Some(now - Duration::seconds(100)),
        };
        let remaining = cache.seconds_until_refresh(300, now).unwrap();
        assert!(remaining > 0 && remaining <= 200);
    }

    #[test]
    fn test_cache_stale_after_interval() {
        let now = Utc::now();
        let cache = AggregationCache {
            items: Vec::new(),
            last_refresh_at: Some(now - Duration::seconds(301)),
        };
        assert_eq!(cache.seconds_until_refresh(300, now), None);
    }

    #[test]
    fn test_archive_outcome_reasons() {
        assert!(ArchiveOutcome::AlreadySaved.reason().contains("already"));
        assert!(!ArchiveOutcome::NotFound.accepted());
        assert!(!ArchiveOutcome::ExtractionFailed.accepted());
    }
}
