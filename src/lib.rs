//! NewsHub - Feed Aggregation & State Cache Engine
//!
//! Fetches RSS feeds from a curated catalog of sources, merges and
//! dedups the results into a time-gated in-memory cache, tracks which
//! items have been seen, and archives full article text on demand.

pub mod aggregator;
pub mod catalog;
pub mod config;
pub mod datetime;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod logging;
pub mod store;

pub use aggregator::{
    AggregateStats, AggregationCache, Aggregator, ArchiveOutcome, NewsItem, Page, PageQuery,
    RefreshOutcome, SortKey, SourceCount,
};
pub use catalog::{Source, SourceCatalog};
pub use config::Config;
pub use error::{NewsHubError, Result};
pub use extract::{HttpTextExtractor, TextExtractor};
pub use fetch::{FeedFetcher, FeedTransport, FetchReport, HttpTransport};
pub use store::{Database, SavedArticle, SavedArticleStore, SelectionRepository};
