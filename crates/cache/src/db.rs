//! Summary cache database.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use std::time::Duration;
use tracing::instrument;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
// Entries are fetched one at a time; a second connection only serves readers
// running alongside the fetch loop.
const MAX_CONNECTIONS: u32 = 2;
const BUSY_TIMEOUT: Duration = Duration::from_millis(1500);

/// Connection pool of the summary cache, migrated on connect.
///
/// Hand it to [`Repository`](crate::Repository) for reads and writes.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the cache database file, creating its parent
    /// directory if needed.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).or_raise(|| ErrorKind::Database)?;
        }
        tracing::debug!(path = %path.display(), "Opening cache database");
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            // Readers never block the single writer.
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(BUSY_TIMEOUT);
        Self::open(options, MAX_CONNECTIONS).await
    }

    /// Fresh, empty database that lives as long as the returned value.
    ///
    /// Do NOT apply `#[cfg(test)]` so that other crates can also use this in their tests.
    pub async fn connect_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new().filename(":memory:").busy_timeout(BUSY_TIMEOUT);
        // Each connection to ":memory:" is its own database.
        Self::open(options, 1).await
    }

    async fn open(options: SqliteConnectOptions, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    #[instrument("migrating summary cache", skip(self))]
    async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.or_raise(|| ErrorKind::Migration)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Wait for in-flight queries, then close every connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_in_memory() {
        let db = Database::connect_in_memory().await.unwrap();
        let tables: Vec<String> = sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table'")
            .fetch_all(db.pool())
            .await
            .unwrap();
        assert!(tables.iter().any(|name| name == "summaries"));
        db.close().await;
        assert!(db.pool().is_closed());
    }

    #[tokio::test]
    async fn test_connect_creates_file_and_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("account").join("metadata.sqlite");
        let db = Database::connect(&path).await.unwrap();
        assert!(path.exists());
        let mode: String = sqlx::query_scalar("PRAGMA journal_mode").fetch_one(db.pool()).await.unwrap();
        assert_eq!(mode, "wal");
        let timeout: i64 = sqlx::query_scalar("PRAGMA busy_timeout").fetch_one(db.pool()).await.unwrap();
        assert_eq!(timeout, 1500);
        db.close().await;
    }

    #[tokio::test]
    async fn test_reopen_keeps_summaries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.sqlite");
        let db = Database::connect(&path).await.unwrap();
        sqlx::query("INSERT INTO summaries (url, metadata, written_at) VALUES ('u', '{}', 0)")
            .execute(db.pool())
            .await
            .unwrap();
        db.close().await;
        // Already-applied migrations are skipped on the second connect.
        let db = Database::connect(&path).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM summaries").fetch_one(db.pool()).await.unwrap();
        assert_eq!(count, 1);
        db.close().await;
    }
}
