//! Persistence layer for NewsHub.
//!
//! SQLite holds the source selection; the saved-article archive is a
//! single JSON file rewritten in full on insert.

pub mod db;
pub mod saved;
pub mod selection;

pub use db::{Database, DbPool};
pub use saved::{build_preview, SavedArticle, SavedArticleStore, PREVIEW_WORDS};
pub use selection::SelectionRepository;
