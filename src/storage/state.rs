//! Cursors, item caches, settings, and the per-cycle atomic commit.

use chrono::{SecondsFormat, Utc};

use super::schema::Store;
use super::types::{CycleCommit, StoreError, StoryRow};
use crate::feed::Story;
use crate::notify::format_badge;
use crate::storage::history::HISTORY_CAP;

/// Dotted settings keys (the logical persisted-state names).
const KEY_UNREAD: &str = "unread.count";
const KEY_NOTIFICATIONS: &str = "notifications.enabled";
const KEY_BADGE_TEXT: &str = "badge.text";
const KEY_BADGE_COLOR: &str = "badge.color";
const KEY_THEME: &str = "display.theme";

impl Store {
    // ========================================================================
    // Settings Operations
    // ========================================================================

    /// Get a single setting value by key, or `None` if not set.
    pub(crate) async fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(value,)| value))
    }

    /// Set a setting value (UPSERT).
    pub(crate) async fn set_setting(&self, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES (?, ?, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Current exact unread counter (0 when never set).
    pub async fn unread_count(&self) -> Result<i64, StoreError> {
        Ok(self
            .get_setting(KEY_UNREAD)
            .await?
            .and_then(|v| v.parse().ok())
            .unwrap_or(0))
    }

    /// Presentation-contract reset: zero the unread counter and clear the
    /// badge. Called when the user opens the story list.
    pub async fn mark_viewed(&self) -> Result<(), StoreError> {
        self.set_setting(KEY_UNREAD, "0").await?;
        self.set_setting(KEY_BADGE_TEXT, "").await?;
        Ok(())
    }

    /// Global notifications flag; defaults to true when never set.
    pub async fn notifications_enabled(&self) -> Result<bool, StoreError> {
        Ok(self
            .get_setting(KEY_NOTIFICATIONS)
            .await?
            .map(|v| v == "true")
            .unwrap_or(true))
    }

    pub async fn set_notifications_enabled(&self, enabled: bool) -> Result<(), StoreError> {
        self.set_setting(KEY_NOTIFICATIONS, if enabled { "true" } else { "false" })
            .await
    }

    /// Badge text as last persisted (empty when cleared).
    pub async fn badge_text(&self) -> Result<String, StoreError> {
        Ok(self.get_setting(KEY_BADGE_TEXT).await?.unwrap_or_default())
    }

    /// Display theme, an opaque string owned by the presentation layer.
    pub async fn theme(&self) -> Result<Option<String>, StoreError> {
        self.get_setting(KEY_THEME).await
    }

    pub async fn set_theme(&self, theme: &str) -> Result<(), StoreError> {
        self.set_setting(KEY_THEME, theme).await
    }

    // ========================================================================
    // Cursor and Cache Operations
    // ========================================================================

    /// The last-seen link for a source, or `None` before its baseline cycle.
    pub async fn cursor(&self, source: &str) -> Result<Option<String>, StoreError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT last_seen_link FROM cursors WHERE source = ?")
                .bind(source)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(link,)| link))
    }

    /// Cached parsed sequence for a source, in feed order (newest first).
    pub async fn cached_stories(&self, source: &str) -> Result<Vec<Story>, StoreError> {
        let rows: Vec<StoryRow> = sqlx::query_as(
            r#"
            SELECT title, link, image, published
            FROM story_cache
            WHERE source = ?
            ORDER BY position
        "#,
        )
        .bind(source)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(StoryRow::into_story).collect())
    }

    // ========================================================================
    // Cycle Commit
    // ========================================================================

    /// Apply all persisted writes for one source's cycle in one transaction:
    /// replace the item cache, advance the cursor, bump the unread counter
    /// and badge, and append-then-trim the alert history.
    ///
    /// Returns the unread total after the commit, for badge display.
    pub async fn commit_cycle(&self, commit: &CycleCommit<'_>) -> Result<i64, StoreError> {
        let now = Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        // Replace the per-source item cache.
        sqlx::query("DELETE FROM story_cache WHERE source = ?")
            .bind(commit.source)
            .execute(&mut *tx)
            .await?;
        for (position, story) in commit.stories.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO story_cache (source, position, title, link, image, published)
                VALUES (?, ?, ?, ?, ?, ?)
            "#,
            )
            .bind(commit.source)
            .bind(position as i64)
            .bind(&story.title)
            .bind(&story.link)
            .bind(&story.image)
            .bind(
                story
                    .published
                    .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true)),
            )
            .execute(&mut *tx)
            .await?;
        }

        // Advance the cursor to the newest record's link.
        sqlx::query(
            r#"
            INSERT INTO cursors (source, last_seen_link, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(source) DO UPDATE SET
                last_seen_link = excluded.last_seen_link,
                updated_at = excluded.updated_at
        "#,
        )
        .bind(commit.source)
        .bind(commit.next_cursor)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        // Unread counter and badge, read-modify-write inside the transaction.
        let current: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
            .bind(KEY_UNREAD)
            .fetch_optional(&mut *tx)
            .await?;
        let unread = current
            .and_then(|(v,)| v.parse::<i64>().ok())
            .unwrap_or(0)
            .saturating_add(commit.unread_delta);
        for (key, value) in [
            (KEY_UNREAD, unread.to_string()),
            (KEY_BADGE_TEXT, format_badge(unread)),
            (KEY_BADGE_COLOR, crate::notify::ALERT_BADGE_COLOR.to_string()),
        ] {
            sqlx::query(
                r#"
                INSERT INTO settings (key, value, updated_at)
                VALUES (?, ?, datetime('now'))
                ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            )
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }

        // Alert history: insert-or-skip by link (idempotent on re-delivery),
        // then evict the oldest entries beyond the cap.
        for alert in &commit.alerts {
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO alert_history (link, title, image, published, keyword, inserted_at)
                VALUES (?, ?, ?, ?, ?, ?)
            "#,
            )
            .bind(&alert.link)
            .bind(&alert.title)
            .bind(&alert.image)
            .bind(
                alert
                    .published
                    .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true)),
            )
            .bind(&alert.keyword)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
        if !commit.alerts.is_empty() {
            sqlx::query(
                r#"
                DELETE FROM alert_history
                WHERE link NOT IN (
                    SELECT link FROM alert_history
                    ORDER BY inserted_at DESC, rowid DESC
                    LIMIT ?
                )
            "#,
            )
            .bind(HISTORY_CAP)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(unread)
    }
}
