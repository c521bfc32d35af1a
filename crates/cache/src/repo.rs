//! Repository for [`Summary`] entries.

use crate::error::{ErrorKind, Result};
use crate::models::SummaryRow;
use crate::{Database, Summary};
use exn::ResultExt;
use sqlx::SqlitePool;

/// Repository for reading and writing summaries in the cache database.
///
/// Summaries are keyed by their canonical request URL. There is at most one
/// summary per URL: [`put`](Self::put) replaces whatever was stored before.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
    dry_run: bool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone(), dry_run: false }
    }
}
impl Repository {
    /// Create a new repository with the given connection pool.
    ///
    /// In `dry_run` mode every write is silently skipped.
    pub fn new(pool: SqlitePool, dry_run: bool) -> Self {
        Self { pool, dry_run }
    }

    /// Get the summary cached for a URL, if any.
    pub async fn get(&self, url: impl AsRef<str>) -> Result<Option<Summary>> {
        let row: Option<SummaryRow> = sqlx::query_as(include_str!("../queries/get_summary.sql"))
            .bind(url.as_ref())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(Summary::try_from).transpose()
    }

    /// Insert a summary, replacing any summary already stored for its URL.
    pub async fn put(&self, summary: &Summary) -> Result<()> {
        if self.dry_run {
            tracing::info!(url = %summary.url, "Skipping cache write during dry-run mode");
            return Ok(());
        }
        let row = SummaryRow::try_from(summary)?;
        sqlx::query(include_str!("../queries/upsert_summary.sql"))
            .bind(row.url)
            .bind(row.data)
            .bind(row.metadata)
            .bind(row.written_at)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    /// Number of summaries in the cache.
    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(include_str!("../queries/count_summaries.sql"))
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        u64::try_from(count).or_raise(|| ErrorKind::InvalidData("count"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, Value, json};

    const URL: &str = "https://api.myanimelist.net/v2/anime/1?nsfw=true&fields=id,title";

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected a JSON object"),
        }
    }

    #[tokio::test]
    async fn test_get_missing() {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        assert!(repo.get(URL).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        let summary = Summary::from_response(URL, object(json!({"id": 1, "title": "Cowboy Bebop"})));
        repo.put(&summary).await.unwrap();
        let cached = repo.get(URL).await.unwrap().unwrap();
        assert_eq!(cached.url, URL);
        assert_eq!(cached.metadata, summary.metadata);
        assert!(cached.has_data());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        repo.put(&Summary::from_status(URL, 500)).await.unwrap();
        repo.put(&Summary::from_response(URL, object(json!({"id": 1, "title": "Cowboy Bebop"}))))
            .await
            .unwrap();
        assert_eq!(repo.count().await.unwrap(), 1);
        let cached = repo.get(URL).await.unwrap().unwrap();
        assert!(cached.has_data());
        assert_eq!(cached.error_status(), None);
    }

    #[tokio::test]
    async fn test_dry_run_skips_writes() {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::new(db.pool().clone(), true);
        repo.put(&Summary::from_status(URL, 404)).await.unwrap();
        assert!(repo.get(URL).await.unwrap().is_none());
        assert_eq!(repo.count().await.unwrap(), 0);
    }
}
