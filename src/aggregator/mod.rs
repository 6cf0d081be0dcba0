//! Feed aggregation: merge, dedup, cache and query views.

pub mod engine;
pub mod merge;
pub mod types;
pub mod views;

pub use engine::Aggregator;
pub use types::{
    AggregateStats, AggregationCache, ArchiveOutcome, NewsItem, Page, PageQuery, RefreshOutcome,
    SortKey, SourceCount, NO_DESCRIPTION, UNTITLED,
};
