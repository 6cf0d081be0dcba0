//! Source catalog for NewsHub.
//!
//! The catalog maps source identifiers to feed endpoints and display
//! names, grouped by category. Built-in entries are fixed at startup;
//! custom sources can be registered at runtime under generated ids.

use std::collections::HashMap;

use uuid::Uuid;

use crate::{NewsHubError, Result};

/// Category assigned to runtime-registered sources.
pub const CUSTOM_CATEGORY: &str = "custom";

/// Built-in sources: (id, endpoint, display name, category).
const BUILTIN_SOURCES: &[(&str, &str, &str, &str)] = &[
    ("lenta", "https://lenta.ru/rss", "Лента.ру", "russian"),
    ("ria", "https://ria.ru/export/rss2/index.xml", "РИА Новости", "russian"),
    ("tass", "https://tass.ru/rss/v2.xml", "ТАСС", "russian"),
    ("kommersant", "https://www.kommersant.ru/RSS/news.xml", "Коммерсантъ", "russian"),
    ("rbc", "https://rssexport.rbc.ru/rbcnews/news/30/full.rss", "РБК", "russian"),
    ("meduza", "https://meduza.io/rss2/all", "Meduza", "russian"),
    ("interfax", "http://www.interfax.ru/rss.asp", "Интерфакс", "russian"),
    ("bbc", "https://feeds.bbci.co.uk/news/rss.xml", "BBC News", "international"),
    ("nytimes", "https://rss.nytimes.com/services/xml/rss/nyt/HomePage.xml", "New York Times", "international"),
    ("reuters", "http://feeds.reuters.com/reuters/topNews", "Reuters", "international"),
    ("cnn", "http://rss.cnn.com/rss/edition.rss", "CNN", "international"),
    ("npr", "https://feeds.npr.org/1001/rss.xml", "NPR", "international"),
    ("dw", "https://rss.dw.com/rdf/rss-en-top", "Deutsche Welle", "international"),
    ("aljazeera", "https://www.aljazeera.com/xml/rss/all.xml", "Al Jazeera", "international"),
    ("guardian", "https://www.theguardian.com/world/rss", "The Guardian", "international"),
    ("habr", "https://habr.com/ru/rss/all/all/?fl=ru", "Хабр", "tech"),
    ("vc", "https://vc.ru/feed", "VC.ru", "tech"),
    ("wired", "https://www.wired.com/feed/rss", "Wired", "tech"),
    ("hackernews", "https://news.ycombinator.com/rss", "Hacker News", "tech"),
    ("github", "https://github.blog/feed/", "GitHub Blog", "tech"),
    ("devto", "https://dev.to/feed", "Dev.to", "tech"),
    ("towardsds", "https://towardsdatascience.com/feed", "Towards Data Science", "ml"),
    ("kdnuggets", "https://www.kdnuggets.com/feed", "KDnuggets", "ml"),
    ("pytorch", "https://pytorch.org/blog/rss.xml", "PyTorch Blog", "ml"),
    ("ai_news", "https://www.artificialintelligence-news.com/feed/", "AI News", "ml"),
];

/// A named external feed endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    /// Stable identifier.
    pub id: String,
    /// Feed endpoint URL.
    pub url: String,
    /// Human-readable name shown in views.
    pub display_name: String,
    /// Category the source belongs to.
    pub category: String,
}

/// Catalog of known sources, built-in plus runtime-registered.
#[derive(Debug, Clone)]
pub struct SourceCatalog {
    sources: Vec<Source>,
    index: HashMap<String, usize>,
}

impl SourceCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Create a catalog populated with the built-in source table.
    pub fn with_defaults() -> Self {
        let mut catalog = Self::new();
        for (id, url, name, category) in BUILTIN_SOURCES {
            catalog.insert(Source {
                id: (*id).to_string(),
                url: (*url).to_string(),
                display_name: (*name).to_string(),
                category: (*category).to_string(),
            });
        }
        catalog
    }

    fn insert(&mut self, source: Source) {
        self.index.insert(source.id.clone(), self.sources.len());
        self.sources.push(source);
    }

    /// Look up a source by id.
    pub fn get(&self, id: &str) -> Option<&Source> {
        self.index.get(id).map(|&i| &self.sources[i])
    }

    /// Check whether an id exists in the catalog.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Display name for a source id, falling back to the id itself.
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.get(id).map(|s| s.display_name.as_str()).unwrap_or(id)
    }

    /// Register a custom source under a generated id.
    ///
    /// The endpoint must be a valid http(s) URL and the name non-empty.
    /// Returns the new id.
    pub fn register_custom(
        &mut self,
        name: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Result<String> {
        let name = name.into();
        let endpoint = endpoint.into();

        if name.trim().is_empty() {
            return Err(NewsHubError::Validation(
                "custom source name must not be empty".to_string(),
            ));
        }

        let parsed = url::Url::parse(&endpoint)
            .map_err(|e| NewsHubError::Validation(format!("invalid feed URL: {}", e)))?;
        match parsed.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(NewsHubError::Validation(format!(
                    "unsupported URL scheme: {}",
                    scheme
                )));
            }
        }

        let id = format!("custom-{}", Uuid::new_v4());
        self.insert(Source {
            id: id.clone(),
            url: endpoint,
            display_name: name.trim().to_string(),
            category: CUSTOM_CATEGORY.to_string(),
        });

        Ok(id)
    }

    /// All sources in registration order.
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// Sources grouped by category, categories in first-appearance order.
    pub fn by_category(&self) -> Vec<(String, Vec<&Source>)> {
        let mut groups: Vec<(String, Vec<&Source>)> = Vec::new();
        for source in &self.sources {
            match groups.iter_mut().find(|(c, _)| *c == source.category) {
                Some((_, list)) => list.push(source),
                None => groups.push((source.category.clone(), vec![source])),
            }
        }
        groups
    }

    /// Number of sources in the catalog.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Check whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl Default for SourceCatalog {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog() {
        let catalog = SourceCatalog::with_defaults();
        assert!(!catalog.is_empty());
        assert!(catalog.contains("bbc"));
        assert!(catalog.contains("habr"));
        assert!(!catalog.contains("nonexistent"));
    }

    #[test]
    fn test_builtin_ids_unique() {
        let catalog = SourceCatalog::with_defaults();
        assert_eq!(catalog.len(), BUILTIN_SOURCES.len());
    }

    #[test]
    fn test_get_source() {
        let catalog = SourceCatalog::with_defaults();
        let source = catalog.get("reuters").unwrap();
        assert_eq!(source.display_name, "Reuters");
        assert_eq!(source.category, "international");
    }

    #[test]
    fn test_display_name_fallback() {
        let catalog = SourceCatalog::with_defaults();
        assert_eq!(catalog.display_name("bbc"), "BBC News");
        assert_eq!(catalog.display_name("unknown-id"), "unknown-id");
    }

    #[test]
    fn test_register_custom() {
        let mut catalog = SourceCatalog::with_defaults();
        let before = catalog.len();

        let id = catalog
            .register_custom("My Blog", "https://example.com/feed.xml")
            .unwrap();
        assert!(id.starts_with("custom-"));
        assert_eq!(catalog.len(), before + 1);

        let source = catalog.get(&id).unwrap();
        assert_eq!(source.display_name, "My Blog");
        assert_eq!(source.category, CUSTOM_CATEGORY);
    }

    #[test]
    fn test_register_custom_generated_ids_distinct() {
        let mut catalog = SourceCatalog::new();
        let a = catalog
            .register_custom("A", "https://example.com/a.xml")
            .unwrap();
        let b = catalog
            .register_custom("B", "https://example.com/b.xml")
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_register_custom_rejects_empty_name() {
        let mut catalog = SourceCatalog::new();
        let result = catalog.register_custom("   ", "https://example.com/feed.xml");
        assert!(matches!(result, Err(NewsHubError::Validation(_))));
    }

    #[test]
    fn test_register_custom_rejects_bad_url() {
        let mut catalog = SourceCatalog::new();
        assert!(catalog.register_custom("X", "not a url").is_err());
        assert!(catalog
            .register_custom("X", "ftp://example.com/feed.xml")
            .is_err());
    }

    #[test]
    fn test_by_category_groups_in_order() {
        let catalog = SourceCatalog::with_defaults();
        let groups = catalog.by_category();
        let names: Vec<&str> = groups.iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(names, vec!["russian", "international", "tech", "ml"]);

        let (_, russian) = &groups[0];
        assert!(russian.iter().any(|s| s.id == "lenta"));
    }

    #[test]
    fn test_custom_appears_in_categories() {
        let mut catalog = SourceCatalog::with_defaults();
        catalog
            .register_custom("Custom Feed", "https://example.com/rss")
            .unwrap();
        let groups = catalog.by_category();
        assert!(groups.iter().any(|(c, _)| c == CUSTOM_CATEGORY));
    }
}
