//! Persisted source selection.
//!
//! The set of sources the user currently wants aggregated. Read at
//! startup, fully rewritten on update.

use std::collections::HashSet;

use super::db::DbPool;
use crate::Result;

/// Repository for the selected-source set.
pub struct SelectionRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> SelectionRepository<'a> {
    /// Create a new SelectionRepository with the given pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Load the persisted selection.
    pub async fn load(&self) -> Result<HashSet<String>> {
        let ids: Vec<String> = sqlx::query_scalar("SELECT source_id FROM selected_sources")
            .fetch_all(self.pool)
            .await?;
        Ok(ids.into_iter().collect())
    }

    /// Replace the persisted selection with the given set.
    pub async fn replace(&self, ids: &HashSet<String>) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM selected_sources")
            .execute(&mut *tx)
            .await?;

        for id in ids {
            sqlx::query("INSERT INTO selected_sources (source_id) VALUES ($1)")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Add one source id to the selection.
    pub async fn add(&self, id: &str) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO selected_sources (source_id) VALUES ($1)")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Number of selected sources.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM selected_sources")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Database;

    fn set(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_load_empty() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = SelectionRepository::new(db.pool());
        assert!(repo.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replace_and_load() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = SelectionRepository::new(db.pool());

        repo.replace(&set(&["bbc", "lenta"])).await.unwrap();
        assert_eq!(repo.load().await.unwrap(), set(&["bbc", "lenta"]));

        // Replace is a full rewrite, not a merge
        repo.replace(&set(&["habr"])).await.unwrap();
        assert_eq!(repo.load().await.unwrap(), set(&["habr"]));
    }

    #[tokio::test]
    async fn test_replace_with_empty_set_clears() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = SelectionRepository::new(db.pool());

        repo.replace(&set(&["bbc"])).await.unwrap();
        repo.replace(&HashSet::new()).await.unwrap();
        assert!(repo.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = SelectionRepository::new(db.pool());

        repo.add("bbc").await.unwrap();
        repo.add("bbc").await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}
