//! Durable saved-article archive.
//!
//! Articles the user explicitly archives are kept in a single JSON file:
//! the whole collection is read on query and rewritten on insert. Inserts
//! are idempotent per source link. The file format matches the original
//! archive layout (camelCase keys), so existing archives stay readable.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Number of whitespace-delimited tokens kept in the preview text.
pub const PREVIEW_WORDS: usize = 100;

/// A user-archived item enriched with full extracted text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedArticle {
    /// Link of the original article; identity of the record.
    pub source_url: String,
    /// Article title at the time of saving.
    pub title: String,
    /// Display name of the source the article came from.
    pub source_name: String,
    /// Title plus the leading tokens of the full text.
    pub preview_text: String,
    /// Full extracted text, never empty.
    pub full_text: String,
    /// When the article was archived.
    pub saved_at: DateTime<Utc>,
}

/// Build the bounded preview: title plus the first [`PREVIEW_WORDS`]
/// tokens of the full text (the text verbatim when it is short enough).
pub fn build_preview(title: &str, full_text: &str) -> String {
    let words: Vec<&str> = full_text.split_whitespace().collect();
    let body = if words.len() > PREVIEW_WORDS {
        words[..PREVIEW_WORDS].join(" ")
    } else {
        full_text.to_string()
    };
    format!("{}. {}", title, body)
}

/// JSON-file store of saved articles with an in-memory link index.
#[derive(Debug)]
pub struct SavedArticleStore {
    path: PathBuf,
    saved_links: HashSet<String>,
}

impl SavedArticleStore {
    /// Open the store at the given path, loading the link index.
    ///
    /// A missing file is an empty archive, not an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut store = Self {
            path,
            saved_links: HashSet::new(),
        };
        for article in store.read_all()? {
            store.saved_links.insert(article.source_url);
        }
        Ok(store)
    }

    fn read_all(&self) -> Result<Vec<SavedArticle>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// All archived articles in insertion order.
    pub fn list(&self) -> Result<Vec<SavedArticle>> {
        self.read_all()
    }

    /// Check whether a link is already archived.
    pub fn contains(&self, link: &str) -> bool {
        self.saved_links.contains(link)
    }

    /// Insert an article, rewriting the whole collection.
    ///
    /// Returns `false` without writing when the link is already archived.
    /// The in-memory index is only updated after a successful write.
    pub fn insert(&mut self, article: SavedArticle) -> Result<bool> {
        if self.saved_links.contains(&article.source_url) {
            return Ok(false);
        }

        let mut articles = self.read_all()?;
        // The index may lag behind an externally modified file
        if articles.iter().any(|a| a.source_url == article.source_url) {
            self.saved_links.insert(article.source_url);
            return Ok(false);
        }

        let link = article.source_url.clone();
        articles.push(article);

        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&articles)?;
        fs::write(&self.path, json)?;

        self.saved_links.insert(link);
        Ok(true)
    }

    /// Number of archived articles.
    pub fn len(&self) -> usize {
        self.saved_links.len()
    }

    /// Check whether the archive is empty.
    pub fn is_empty(&self) -> bool {
        self.saved_links.is_empty()
    }
}
