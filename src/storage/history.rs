//! Bounded keyword-alert history.
//!
//! Entries are appended inside `commit_cycle`; this module holds the read
//! side and the retention constant.

use chrono::{DateTime, Utc};

use super::schema::Store;
use super::types::{AlertEntry, StoreError};

/// Retention cap: the history keeps the most recent unique-by-link entries.
pub const HISTORY_CAP: i64 = 50;

/// Row shape for history queries (link + keyword on top of the story fields).
#[derive(Debug, sqlx::FromRow)]
struct HistoryRow {
    link: String,
    title: String,
    image: String,
    published: Option<String>,
    keyword: String,
}

impl Store {
    /// Alert history, newest first.
    pub async fn alert_history(&self) -> Result<Vec<AlertEntry>, StoreError> {
        let rows: Vec<HistoryRow> = sqlx::query_as(
            r#"
            SELECT link, title, image, published, keyword
            FROM alert_history
            ORDER BY inserted_at DESC, rowid DESC
        "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| AlertEntry {
                link: row.link,
                title: row.title,
                image: row.image,
                published: row
                    .published
                    .as_deref()
                    .and_then(|p| DateTime::parse_from_rfc3339(p).ok())
                    .map(|dt| dt.with_timezone(&Utc)),
                keyword: row.keyword,
            })
            .collect())
    }
}
