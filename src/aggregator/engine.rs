//! The aggregation engine.
//!
//! `Aggregator` is the single shared context object request handlers are
//! given: it owns the source catalog, the aggregation cache, the viewed
//! set, the persisted selection and the saved-article archive. Readers
//! clone a snapshot of the cache under a read lock; every mutating
//! operation goes through an exclusive lock, and the whole refresh is
//! serialized through a dedicated mutex so the list swap is atomic.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::catalog::{Source, SourceCatalog};
use crate::config::Config;
use crate::extract::TextExtractor;
use crate::fetch::{FeedFetcher, FeedTransport};
use crate::store::{build_preview, Database, SavedArticle, SavedArticleStore, SelectionRepository};
use crate::Result;

use super::merge::merge_sorted;
use super::types::{
    AggregateStats, AggregationCache, ArchiveOutcome, NewsItem, Page, PageQuery, RefreshOutcome,
    SortKey,
};
use super::views;

/// Feed aggregation and state cache engine.
pub struct Aggregator {
    config: Config,
    catalog: RwLock<SourceCatalog>,
    db: Database,
    fetcher: FeedFetcher,
    extractor: Arc<dyn TextExtractor>,
    cache: RwLock<AggregationCache>,
    viewed: RwLock<HashSet<String>>,
    saved: Mutex<SavedArticleStore>,
    // Serializes whole refresh cycles, including the gate check
    refresh_guard: Mutex<()>,
}

impl Aggregator {
    /// Build an engine over the given collaborators.
    ///
    /// The saved-article store is opened (and its link index loaded)
    /// from the configured path.
    pub fn new(
        config: Config,
        db: Database,
        transport: Arc<dyn FeedTransport>,
        extractor: Arc<dyn TextExtractor>,
    ) -> Result<Self> {
        let saved = SavedArticleStore::open(&config.storage.saved_articles_path)?;
        let fetcher = FeedFetcher::new(transport, &config.fetch);

        Ok(Self {
            config,
            catalog: RwLock::new(SourceCatalog::with_defaults()),
            db,
            fetcher,
            extractor,
            cache: RwLock::new(AggregationCache::default()),
            viewed: RwLock::new(HashSet::new()),
            saved: Mutex::new(saved),
            refresh_guard: Mutex::new(()),
        })
    }

    /// Resolve the active selection to catalog sources.
    ///
    /// An empty persisted selection falls back to the configured default
    /// set; ids no longer in the catalog are skipped, not errors.
    async fn active_sources(&self) -> Result<Vec<Source>> {
        let selection = SelectionRepository::new(self.db.pool()).load().await?;
        let ids: Vec<String> = if selection.is_empty() {
            self.config.sources.default_selected.clone()
        } else {
            selection.into_iter().collect()
        };

        let catalog = self.catalog.read().await;
        let mut sources = Vec::new();
        for id in ids {
            match catalog.get(&id) {
                Some(source) => sources.push(source.clone()),
                None => debug!("Skipping unknown source id: {}", id),
            }
        }
        Ok(sources)
    }

    /// Request a refresh of the aggregation cache.
    ///
    /// Rejected while the gate window is open, reporting the seconds
    /// remaining. On success the whole list is replaced; on total fetch
    /// failure the previous list and the gate timestamp are retained.
    /// The viewed set is never touched by a refresh.
    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        let _guard = self.refresh_guard.lock().await;

        let interval = self.config.cache.refresh_interval_secs;
        let now = Utc::now();
        if let Some(remaining) = self.cache.read().await.seconds_until_refresh(interval, now) {
            debug!("Refresh throttled, {} second(s) remaining", remaining);
            return Ok(RefreshOutcome::Throttled {
                seconds_remaining: remaining,
            });
        }

        let sources = self.active_sources().await?;
        if sources.is_empty() {
            warn!("Refresh failed: selection resolves to no known sources");
            return Ok(RefreshOutcome::Failed {
                reason: "no known sources selected".to_string(),
            });
        }

        let report = self.fetcher.fetch_all(&sources).await;
        if report.all_failed() {
            warn!("Refresh failed: all {} source(s) unreachable", report.attempted);
            return Ok(RefreshOutcome::Failed {
                reason: format!("all {} sources failed", report.attempted),
            });
        }

        let sources_ok = report.succeeded();
        let items = merge_sorted(
            report.lists,
            SortKey::default(),
            self.config.cache.max_items,
        );
        let count = items.len();

        {
            let mut cache = self.cache.write().await;
            cache.items = items;
            cache.last_refresh_at = Some(Utc::now());
        }

        info!(
            "Cache refreshed: {} item(s) from {} source(s)",
            count, sources_ok
        );
        Ok(RefreshOutcome::Refreshed {
            items: count,
            sources: sources_ok,
        })
    }

    /// Snapshot of the cached items.
    pub async fn items(&self) -> Vec<NewsItem> {
        self.cache.read().await.items.clone()
    }

    /// When the last successful refresh completed.
    pub async fn last_refresh_at(&self) -> Option<DateTime<Utc>> {
        self.cache.read().await.last_refresh_at
    }

    /// One page of the cached items, filtered and sorted per the query.
    pub async fn page(&self, query: &PageQuery) -> Page<NewsItem> {
        let snapshot = self.items().await;
        let filtered = match &query.source {
            Some(id) => views::filter_by_source(&snapshot, id),
            None => snapshot,
        };
        let sorted = views::sorted_by(&filtered, query.sort);
        views::paginate(&sorted, query.page, self.config.view.page_size)
    }

    /// Search cached items; a blank query yields zero results.
    pub async fn search(&self, query: &str) -> Vec<NewsItem> {
        let snapshot = self.items().await;
        views::search(&snapshot, query)
    }

    /// Number of cached items not yet marked as seen.
    pub async fn new_count(&self) -> usize {
        let snapshot = self.items().await;
        let viewed = self.viewed.read().await;
        views::count_new(&snapshot, &viewed)
    }

    /// Mark the given items as seen.
    pub async fn mark_viewed<'a, I>(&self, items: I)
    where
        I: IntoIterator<Item = &'a NewsItem>,
    {
        let mut viewed = self.viewed.write().await;
        for item in items {
            viewed.insert(item.fingerprint());
        }
    }

    /// Clear the viewed set; every cached item counts as new again.
    pub async fn clear_viewed(&self) {
        self.viewed.write().await.clear();
        info!("Viewed set cleared");
    }

    /// Aggregate statistics over the current cache.
    pub async fn stats(&self) -> Result<AggregateStats> {
        let snapshot = self.items().await;

        let selection = SelectionRepository::new(self.db.pool()).load().await?;
        let selected_sources = if selection.is_empty() {
            self.config.sources.default_selected.len()
        } else {
            selection.len()
        };

        let distinct_sources = snapshot
            .iter()
            .map(|i| i.source_id.as_str())
            .collect::<HashSet<_>>()
            .len();

        let new_count = {
            let viewed = self.viewed.read().await;
            views::count_new(&snapshot, &viewed)
        };

        Ok(AggregateStats {
            total_items: snapshot.len(),
            distinct_sources,
            selected_sources,
            new_count,
            last_refresh_at: self.last_refresh_at().await,
            by_source: views::stats_by_source(&snapshot, self.config.view.stats_limit),
        })
    }

    /// Archive a currently-cached item by its link.
    ///
    /// Idempotent per link; rejected with a reason when the link is not
    /// cached or extraction yields nothing. A record is only persisted
    /// with non-empty full text.
    pub async fn archive(&self, link: &str) -> Result<ArchiveOutcome> {
        // One lock serializes extraction and the read-modify-write of
        // the archive file
        let mut saved = self.saved.lock().await;

        let item = {
            let cache = self.cache.read().await;
            cache.items.iter().find(|i| i.link == link).cloned()
        };
        let Some(item) = item else {
            return Ok(ArchiveOutcome::NotFound);
        };

        if saved.contains(link) {
            return Ok(ArchiveOutcome::AlreadySaved);
        }

        let full_text = self.extractor.extract_main_text(link).await;
        if full_text.trim().is_empty() {
            warn!("Text extraction yielded nothing for {}", link);
            return Ok(ArchiveOutcome::ExtractionFailed);
        }

        let article = SavedArticle {
            source_url: item.link.clone(),
            title: item.title.clone(),
            source_name: item.source_name.clone(),
            preview_text: build_preview(&item.title, &full_text),
            full_text,
            saved_at: Utc::now(),
        };

        if saved.insert(article.clone())? {
            info!("Article archived: {}", article.title);
            Ok(ArchiveOutcome::Saved(article))
        } else {
            Ok(ArchiveOutcome::AlreadySaved)
        }
    }

    /// One page of the saved-article archive.
    pub async fn saved_articles(&self, page: usize) -> Result<Page<SavedArticle>> {
        let saved = self.saved.lock().await;
        let all = saved.list()?;
        Ok(views::paginate(&all, page, self.config.view.page_size))
    }

    /// Number of archived articles.
    pub async fn saved_count(&self) -> usize {
        self.saved.lock().await.len()
    }

    /// The persisted source selection.
    pub async fn selected_sources(&self) -> Result<HashSet<String>> {
        SelectionRepository::new(self.db.pool()).load().await
    }

    /// Replace the persisted source selection.
    pub async fn update_selection(&self, ids: HashSet<String>) -> Result<()> {
        SelectionRepository::new(self.db.pool()).replace(&ids).await
    }

    /// Register a custom source and add it to the selection.
    ///
    /// Returns the generated source id.
    pub async fn add_custom_source(
        &self,
        name: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Result<String> {
        let id = {
            let mut catalog = self.catalog.write().await;
            catalog.register_custom(name, endpoint)?
        };
        SelectionRepository::new(self.db.pool()).add(&id).await?;
        info!("Custom source registered: {}", id);
        Ok(id)
    }

    /// Catalog sources grouped by category, for the selection view.
    pub async fn sources_by_category(&self) -> Vec<(String, Vec<Source>)> {
        let catalog = self.catalog.read().await;
        catalog
            .by_category()
            .into_iter()
            .map(|(category, sources)| (category, sources.into_iter().cloned().collect()))
            .collect()
    }

    /// Display name for a source id.
    pub async fn display_name(&self, id: &str) -> String {
        self.catalog.read().await.display_name(id).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NewsHubError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    /// Transport serving canned feed bodies keyed by URL.
    struct StubTransport {
        bodies: StdMutex<HashMap<String, Vec<u8>>>,
    }

    impl StubTransport {
        fn new() -> Self {
            Self {
                bodies: StdMutex::new(HashMap::new()),
            }
        }

        fn set(&self, url: &str, body: Vec<u8>) {
            self.bodies.lock().unwrap().insert(url.to_string(), body);
        }
    }

    #[async_trait]
    impl FeedTransport for StubTransport {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            self.bodies
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .ok_or_else(|| NewsHubError::Fetch("unreachable".to_string()))
        }
    }

    /// Extractor returning a fixed text, or nothing.
    struct StubExtractor {
        text: String,
    }

    #[async_trait]
    impl TextExtractor for StubExtractor {
        async fn extract_main_text(&self, _url: &str) -> String {
            self.text.clone()
        }
    }

    fn rss(items: &str) -> Vec<u8> {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Feed</title>{}</channel></rss>"#,
            items
        )
        .into_bytes()
    }

    fn entry(guid: &str, link: &str, title: &str, date: &str) -> String {
        format!(
            "<item><guid>{}</guid><link>{}</link><title>{}</title><pubDate>{}</pubDate></item>",
            guid, link, title, date
        )
    }

    struct TestEnv {
        engine: Aggregator,
        transport: Arc<StubTransport>,
        _dir: tempfile::TempDir,
    }

    /// Engine over an in-memory db, temp archive and stub collaborators.
    ///
    /// The selection is pinned to bbc + reuters; refresh gating uses the
    /// given interval.
    async fn setup(interval_secs: u64, extracted_text: &str) -> TestEnv {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.cache.refresh_interval_secs = interval_secs;
        config.storage.saved_articles_path = dir
            .path()
            .join("articles.json")
            .to_string_lossy()
            .into_owned();

        let db = Database::open_in_memory().await.unwrap();
        let transport = Arc::new(StubTransport::new());
        let extractor = Arc::new(StubExtractor {
            text: extracted_text.to_string(),
        });

        let engine = Aggregator::new(config, db, transport.clone(), extractor).unwrap();
        engine
            .update_selection(
                ["bbc", "reuters"].iter().map(|s| s.to_string()).collect(),
            )
            .await
            .unwrap();

        TestEnv {
            engine,
            transport,
            _dir: dir,
        }
    }

    fn feed_bbc() -> Vec<u8> {
        rss(&format!(
            "{}{}",
            entry(
                "g1",
                "https://e.com/1",
                "First story",
                "Wed, 03 Jan 2024 00:00:00 GMT"
            ),
            entry(
                "g2",
                "https://e.com/2",
                "Second story",
                "Tue, 02 Jan 2024 00:00:00 GMT"
            ),
        ))
    }

    fn feed_reuters() -> Vec<u8> {
        // g3 is new; r2 syndicates the link of g2
        rss(&format!(
            "{}{}",
            entry(
                "g3",
                "https://e.com/3",
                "Third story",
                "Mon, 01 Jan 2024 00:00:00 GMT"
            ),
            entry(
                "r2",
                "https://e.com/2",
                "Second story copy",
                "Tue, 02 Jan 2024 00:00:00 GMT"
            ),
        ))
    }

    fn bbc_url() -> &'static str {
        "https://feeds.bbci.co.uk/news/rss.xml"
    }

    fn reuters_url() -> &'static str {
        "http://feeds.reuters.com/reuters/topNews"
    }

    #[tokio::test]
    async fn test_refresh_merges_and_dedups() {
        let env = setup(0, "text").await;
        env.transport.set(bbc_url(), feed_bbc());
        env.transport.set(reuters_url(), feed_reuters());

        let outcome = env.engine.refresh().await.unwrap();
        assert!(matches!(outcome, RefreshOutcome::Refreshed { items: 3, .. }));

        let items = env.engine.items().await;
        let links: Vec<&str> = items.iter().map(|i| i.link.as_str()).collect();
        assert_eq!(
            links,
            vec!["https://e.com/1", "https://e.com/2", "https://e.com/3"]
        );
        // The duplicate kept its first-seen attribution
        assert_eq!(items[1].source_id, "bbc");
    }

    #[tokio::test]
    async fn test_refresh_gate_rejects_and_keeps_cache() {
        let env = setup(300, "text").await;
        env.transport.set(bbc_url(), feed_bbc());
        env.transport.set(reuters_url(), feed_reuters());

        let first = env.engine.refresh().await.unwrap();
        assert!(first.is_refreshed());
        let before = env.engine.items().await;

        // Feed content changes, but the gate is still closed
        env.transport.set(bbc_url(), rss(""));
        let second = env.engine.refresh().await.unwrap();
        match second {
            RefreshOutcome::Throttled { seconds_remaining } => {
                assert!(seconds_remaining > 0 && seconds_remaining <= 300);
            }
            other => panic!("expected Throttled, got {:?}", other),
        }
        assert_eq!(env.engine.items().await, before);
    }

    #[tokio::test]
    async fn test_refresh_total_failure_keeps_cache_and_gate() {
        let env = setup(0, "text").await;
        env.transport.set(bbc_url(), feed_bbc());
        env.transport.set(reuters_url(), feed_reuters());
        env.engine.refresh().await.unwrap();
        let before = env.engine.items().await;
        let stamp = env.engine.last_refresh_at().await;

        // Drop every feed: total failure
        env.transport.bodies.lock().unwrap().clear();
        let outcome = env.engine.refresh().await.unwrap();
        assert!(matches!(outcome, RefreshOutcome::Failed { .. }));
        assert_eq!(env.engine.items().await, before);
        assert_eq!(env.engine.last_refresh_at().await, stamp);
    }

    #[tokio::test]
    async fn test_refresh_partial_failure_still_succeeds() {
        let env = setup(0, "text").await;
        env.transport.set(bbc_url(), feed_bbc());
        // reuters stays unreachable

        let outcome = env.engine.refresh().await.unwrap();
        assert!(matches!(
            outcome,
            RefreshOutcome::Refreshed {
                items: 2,
                sources: 1
            }
        ));
    }

    #[tokio::test]
    async fn test_empty_selection_falls_back_to_defaults() {
        let env = setup(0, "text").await;
        env.engine.update_selection(HashSet::new()).await.unwrap();
        // Default set is lenta/ria/bbc; serve only bbc
        env.transport.set(bbc_url(), feed_bbc());

        let outcome = env.engine.refresh().await.unwrap();
        assert!(outcome.is_refreshed());
        assert_eq!(env.engine.items().await.len(), 2);
    }

    #[tokio::test]
    async fn test_stale_selection_ids_are_skipped() {
        let env = setup(0, "text").await;
        env.engine
            .update_selection(
                ["bbc", "gone-from-catalog"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            )
            .await
            .unwrap();
        env.transport.set(bbc_url(), feed_bbc());

        let outcome = env.engine.refresh().await.unwrap();
        assert!(matches!(
            outcome,
            RefreshOutcome::Refreshed {
                items: 2,
                sources: 1
            }
        ));
    }

    #[tokio::test]
    async fn test_new_count_and_viewed_lifecycle() {
        let env = setup(0, "text").await;
        env.transport.set(bbc_url(), feed_bbc());
        env.transport.set(reuters_url(), feed_reuters());
        env.engine.refresh().await.unwrap();

        assert_eq!(env.engine.new_count().await, 3);

        let items = env.engine.items().await;
        env.engine.mark_viewed(&items[..2]).await;
        assert_eq!(env.engine.new_count().await, 1);

        // Marking again never increases the count
        env.engine.mark_viewed(&items[..2]).await;
        assert_eq!(env.engine.new_count().await, 1);

        env.engine.clear_viewed().await;
        assert_eq!(env.engine.new_count().await, 3);
    }

    #[tokio::test]
    async fn test_viewed_survives_refresh() {
        let env = setup(0, "text").await;
        env.transport.set(bbc_url(), feed_bbc());
        env.engine.refresh().await.unwrap();

        let items = env.engine.items().await;
        env.engine.mark_viewed(items.iter()).await;
        assert_eq!(env.engine.new_count().await, 0);

        env.engine.refresh().await.unwrap();
        // Same items, same fingerprints: still nothing new
        assert_eq!(env.engine.new_count().await, 0);
    }

    #[tokio::test]
    async fn test_archive_lifecycle() {
        let env = setup(0, "Full article body text").await;
        env.transport.set(bbc_url(), feed_bbc());
        env.engine.refresh().await.unwrap();

        let outcome = env.engine.archive("https://e.com/1").await.unwrap();
        match &outcome {
            ArchiveOutcome::Saved(article) => {
                assert_eq!(article.source_url, "https://e.com/1");
                assert_eq!(article.title, "First story");
                assert!(article.preview_text.starts_with("First story. "));
                assert_eq!(article.full_text, "Full article body text");
            }
            other => panic!("expected Saved, got {:?}", other),
        }
        assert_eq!(env.engine.saved_count().await, 1);

        // Second archive of the same link is a no-op
        let again = env.engine.archive("https://e.com/1").await.unwrap();
        assert_eq!(again, ArchiveOutcome::AlreadySaved);
        assert_eq!(env.engine.saved_count().await, 1);
    }

    #[tokio::test]
    async fn test_archive_not_found() {
        let env = setup(0, "text").await;
        env.transport.set(bbc_url(), feed_bbc());
        env.engine.refresh().await.unwrap();

        let outcome = env.engine.archive("https://nope.com/x").await.unwrap();
        assert_eq!(outcome, ArchiveOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_archive_extraction_failure_persists_nothing() {
        let env = setup(0, "").await;
        env.transport.set(bbc_url(), feed_bbc());
        env.engine.refresh().await.unwrap();

        let outcome = env.engine.archive("https://e.com/1").await.unwrap();
        assert_eq!(outcome, ArchiveOutcome::ExtractionFailed);
        assert_eq!(env.engine.saved_count().await, 0);
        assert!(env
            .engine
            .saved_articles(1)
            .await
            .unwrap()
            .items
            .is_empty());
    }

    #[tokio::test]
    async fn test_page_filter_and_sort() {
        let env = setup(0, "text").await;
        env.transport.set(bbc_url(), feed_bbc());
        env.transport.set(reuters_url(), feed_reuters());
        env.engine.refresh().await.unwrap();

        let all = env.engine.page(&PageQuery::default()).await;
        assert_eq!(all.total_items, 3);
        assert_eq!(all.total_pages, 1);

        let filtered = env
            .engine
            .page(&PageQuery {
                source: Some("reuters".to_string()),
                ..PageQuery::default()
            })
            .await;
        assert_eq!(filtered.total_items, 1);

        let by_title = env
            .engine
            .page(&PageQuery {
                sort: SortKey::Title,
                ..PageQuery::default()
            })
            .await;
        assert_eq!(by_title.items[0].title, "First story");
    }

    #[tokio::test]
    async fn test_page_empty_cache() {
        let env = setup(300, "text").await;
        let page = env.engine.page(&PageQuery::default()).await;
        assert_eq!(page.total_pages, 1);
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn test_search_via_engine() {
        let env = setup(0, "text").await;
        env.transport.set(bbc_url(), feed_bbc());
        env.engine.refresh().await.unwrap();

        assert!(env.engine.search("").await.is_empty());
        assert!(env.engine.search("xyz-no-match").await.is_empty());
        assert_eq!(env.engine.search("FIRST").await.len(), 1);
        // Source display name matches too
        assert_eq!(env.engine.search("bbc").await.len(), 2);
    }

    #[tokio::test]
    async fn test_stats() {
        let env = setup(0, "text").await;
        env.transport.set(bbc_url(), feed_bbc());
        env.transport.set(reuters_url(), feed_reuters());
        env.engine.refresh().await.unwrap();

        let stats = env.engine.stats().await.unwrap();
        assert_eq!(stats.total_items, 3);
        assert_eq!(stats.distinct_sources, 2);
        assert_eq!(stats.selected_sources, 2);
        assert_eq!(stats.new_count, 3);
        assert!(stats.last_refresh_at.is_some());
        assert_eq!(stats.by_source[0].name, "BBC News");
        assert_eq!(stats.by_source[0].count, 2);
    }

    #[tokio::test]
    async fn test_add_custom_source_joins_selection_and_fetch() {
        let env = setup(0, "text").await;
        let id = env
            .engine
            .add_custom_source("My Blog", "https://example.com/feed.xml")
            .await
            .unwrap();

        assert!(env.engine.selected_sources().await.unwrap().contains(&id));
        assert_eq!(env.engine.display_name(&id).await, "My Blog");

        env.transport.set(
            "https://example.com/feed.xml",
            rss(&entry(
                "c1",
                "https://example.com/post",
                "Custom post",
                "Wed, 03 Jan 2024 00:00:00 GMT",
            )),
        );
        env.transport.set(bbc_url(), feed_bbc());
        env.transport.set(reuters_url(), feed_reuters());

        env.engine.refresh().await.unwrap();
        let items = env.engine.items().await;
        assert!(items.iter().any(|i| i.source_id == id));
    }

    #[tokio::test]
    async fn test_sources_by_category_includes_custom() {
        let env = setup(0, "text").await;
        env.engine
            .add_custom_source("My Blog", "https://example.com/feed.xml")
            .await
            .unwrap();

        let groups = env.engine.sources_by_category().await;
        assert!(groups.iter().any(|(c, _)| c == "custom"));
    }
}
