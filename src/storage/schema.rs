use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;

use super::types::StoreError;

// ============================================================================
// Store
// ============================================================================

/// Process-wide persistence store backed by SQLite.
///
/// Every entity the pipeline persists (item caches, cursors, keyword list,
/// alert history, counters, flags) lives here; nothing is deleted except via
/// bounded history eviction or explicit keyword removal.
#[derive(Clone)]
pub struct Store {
    pub(crate) pool: SqlitePool,
}

impl Store {
    /// Open the store and run migrations
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InstanceLocked` if another instance of newsdesk
    /// has the database locked (SQLITE_BUSY, SQLITE_LOCKED, SQLITE_CANTOPEN).
    /// Returns `StoreError::Migration` when schema setup fails.
    pub async fn open(path: &str) -> Result<Self, StoreError> {
        let url = format!("sqlite:{}?mode=rwc", path);

        // Restrict the database file to the owning user.
        #[cfg(unix)]
        if path != ":memory:" {
            use std::os::unix::fs::PermissionsExt;
            let db_path = std::path::Path::new(path);
            if db_path.exists() {
                let perms = std::fs::Permissions::from_mode(0o600);
                if let Err(e) = std::fs::set_permissions(path, perms) {
                    tracing::warn!(path = %path, error = %e, "Failed to set database file permissions");
                }
            } else if let Some(parent) = db_path.parent() {
                if parent.exists() {
                    // Pre-create with mode 0600 so the file never exists with
                    // default umask permissions.
                    use std::os::unix::fs::OpenOptionsExt;
                    let _file = std::fs::OpenOptions::new()
                        .write(true)
                        .create_new(true)
                        .mode(0o600)
                        .open(db_path)
                        .ok(); // If creation fails, SQLite reports it at connect.
                }
            }
        }

        // busy_timeout=5000: SQLite waits up to 5 seconds for locks to release
        // before returning SQLITE_BUSY, which absorbs transient contention
        // between a running cycle and a CLI read.
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(StoreError::from_sqlx)?
            .pragma("busy_timeout", "5000");

        // An in-memory SQLite database is per-connection; keep a single
        // connection there so tests observe one schema.
        let max_connections = if path == ":memory:" { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(StoreError::from_sqlx)?;
        let store = Self { pool };
        store.migrate().await.map_err(|e| {
            let error_string = e.to_string().to_lowercase();
            if error_string.contains("database is locked")
                || error_string.contains("database table is locked")
                || error_string.contains("sqlite_busy")
                || error_string.contains("sqlite_locked")
            {
                StoreError::InstanceLocked
            } else {
                StoreError::Migration(e.to_string())
            }
        })?;
        Ok(store)
    }

    /// Run schema migrations atomically within a transaction.
    ///
    /// All statements use `IF NOT EXISTS`, so re-running on an existing
    /// database is a no-op; a failure mid-way rolls the schema back to its
    /// previous consistent state.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        // Per-connection setting, must run outside the transaction.
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&self.pool)
            .await?;

        let mut tx = self.pool.begin().await?;

        // Per-source parsed item cache, bounded by the parser (15 rows).
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS story_cache (
                source TEXT NOT NULL,
                position INTEGER NOT NULL,
                title TEXT NOT NULL,
                link TEXT NOT NULL,
                image TEXT NOT NULL,
                published TEXT,
                PRIMARY KEY (source, position)
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        // Per-source novelty cursor.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cursors (
                source TEXT PRIMARY KEY,
                last_seen_link TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        // User keyword list: insertion order preserved, case-insensitively
        // unique via the word_lower column.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS keywords (
                word TEXT NOT NULL,
                word_lower TEXT NOT NULL UNIQUE,
                position INTEGER NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        // Bounded keyword-alert history, deduplicated by link.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS alert_history (
                link TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                image TEXT NOT NULL,
                published TEXT,
                keyword TEXT NOT NULL,
                inserted_at INTEGER NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_alert_history_recency
             ON alert_history(inserted_at DESC)",
        )
        .execute(&mut *tx)
        .await?;

        // Key-value settings (unread counter, flags, badge, theme).
        // Keys use dotted convention: unread.count, notifications.enabled, ...
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }
}
