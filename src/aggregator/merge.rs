//! Cross-source deduplication and merge.

use std::collections::HashSet;

use super::types::{NewsItem, SortKey};

/// Merge per-source item lists into one list with no duplicate guid or
/// link.
///
/// Identity sets start empty for every pass; an item is accepted only if
/// neither its guid nor its link has been seen, and the first occurrence
/// wins. Duplicates across sources are expected to be near-identical
/// syndication copies, so source-iteration order deciding the winner is
/// acceptable.
pub fn merge(lists: Vec<Vec<NewsItem>>) -> Vec<NewsItem> {
    let mut seen_guids: HashSet<String> = HashSet::new();
    let mut seen_links: HashSet<String> = HashSet::new();
    let mut accepted = Vec::new();

    for list in lists {
        for item in list {
            if seen_guids.contains(&item.guid) || seen_links.contains(&item.link) {
                continue;
            }
            seen_guids.insert(item.guid.clone());
            seen_links.insert(item.link.clone());
            accepted.push(item);
        }
    }

    accepted
}

/// Sort items in place by the given key. The sort is stable.
///
/// `Date` sorts newest first with undated items last; `Title` and
/// `SourceName` sort ascending, case-insensitive.
pub fn sort_items(items: &mut [NewsItem], key: SortKey) {
    match key {
        SortKey::Date => {
            items.sort_by(|a, b| match (a.published_at, b.published_at) {
                (Some(x), Some(y)) => y.cmp(&x),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            });
        }
        SortKey::Title => {
            items.sort_by_key(|i| i.title.to_lowercase());
        }
        SortKey::SourceName => {
            items.sort_by_key(|i| i.source_name.to_lowercase());
        }
    }
}

/// Merge, sort by the active key, and truncate to the cache cap.
pub fn merge_sorted(lists: Vec<Vec<NewsItem>>, key: SortKey, max_items: usize) -> Vec<NewsItem> {
    let mut items = merge(lists);
    sort_items(&mut items, key);
    items.truncate(max_items);
    items
}
