//! Query views: pure, non-mutating projections over the cached items.

use std::collections::{HashMap, HashSet};

use super::merge::sort_items;
use super::types::{NewsItem, Page, SortKey, SourceCount};

/// Items from a single source.
pub fn filter_by_source(items: &[NewsItem], source_id: &str) -> Vec<NewsItem> {
    items
        .iter()
        .filter(|i| i.source_id == source_id)
        .cloned()
        .collect()
}

/// A sorted copy of the items.
pub fn sorted_by(items: &[NewsItem], key: SortKey) -> Vec<NewsItem> {
    let mut copy = items.to_vec();
    sort_items(&mut copy, key);
    copy
}

/// One page of items, 1-indexed.
///
/// An out-of-range page number clamps into `[1, total_pages]`;
/// `total_pages` is at least 1 even for an empty input.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total_items = items.len();
    let total_pages = std::cmp::max(1, total_items.div_ceil(page_size));
    let page = page.clamp(1, total_pages);

    let start = (page - 1) * page_size;
    let end = std::cmp::min(start + page_size, total_items);
    let page_items = if start < total_items {
        items[start..end].to_vec()
    } else {
        Vec::new()
    };

    Page {
        items: page_items,
        page,
        page_size,
        total_items,
        total_pages,
    }
}

/// Case-insensitive substring search over title, summary and source
/// display name.
///
/// A blank query means "no query" and yields zero results, never the
/// full set.
pub fn search(items: &[NewsItem], query: &str) -> Vec<NewsItem> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }

    items
        .iter()
        .filter(|i| {
            i.title.to_lowercase().contains(&query)
                || i.summary.to_lowercase().contains(&query)
                || i.source_name.to_lowercase().contains(&query)
        })
        .cloned()
        .collect()
}

/// Number of items whose fingerprint is not in the viewed set.
pub fn count_new(items: &[NewsItem], viewed: &HashSet<String>) -> usize {
    items
        .iter()
        .filter(|i| !viewed.contains(&i.fingerprint()))
        .count()
}

/// Item counts grouped by source display name, most items first, capped
/// to `limit` for display.
pub fn stats_by_source(items: &[NewsItem], limit: usize) -> Vec<SourceCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for item in items {
        *counts.entry(item.source_name.as_str()).or_insert(0) += 1;
    }

    let mut stats: Vec<SourceCount> = counts
        .into_iter()
        .map(|(name, count)| SourceCount {
            name: name.to_string(),
            count,
        })
        .collect();
    // Ties break alphabetically so the output is deterministic
    stats.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    stats.truncate(limit);
    stats
}
