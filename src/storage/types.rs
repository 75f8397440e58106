use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::feed::Story;

// ============================================================================
// Error Types
// ============================================================================

/// Store-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another instance of the application has locked the database
    #[error("Another instance of newsdesk appears to be running. Please close it and try again.")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl StoreError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let error_string = err.to_string().to_lowercase();

        // SQLITE_BUSY (5): database is locked
        // SQLITE_LOCKED (6): database table is locked
        // SQLITE_CANTOPEN (14): unable to open database file
        if error_string.contains("database is locked")
            || error_string.contains("database table is locked")
            || error_string.contains("sqlite_busy")
            || error_string.contains("sqlite_locked")
            || error_string.contains("unable to open database file")
        {
            return StoreError::InstanceLocked;
        }

        StoreError::Other(err)
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// A story that matched a keyword at detection time, retained in the bounded
/// alert history.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AlertEntry {
    pub link: String,
    pub title: String,
    pub image: String,
    pub published: Option<DateTime<Utc>>,
    /// The keyword that matched when the alert was raised.
    pub keyword: String,
}

impl AlertEntry {
    pub fn from_story(story: &Story, keyword: &str) -> Self {
        Self {
            link: story.link.clone(),
            title: story.title.clone(),
            image: story.image.clone(),
            published: story.published,
            keyword: keyword.to_string(),
        }
    }
}

/// All persisted writes for one source's cycle, applied as a single
/// transaction so a crash cannot leave the cursor advanced but the counter or
/// history stale.
#[derive(Debug)]
pub struct CycleCommit<'a> {
    pub source: &'a str,
    /// Full parsed sequence for the item cache (bounded by the parser).
    pub stories: &'a [Story],
    /// Link the cursor advances to.
    pub next_cursor: &'a str,
    /// Number of genuinely new stories this cycle.
    pub unread_delta: i64,
    /// Keyword-matched stories to prepend to the alert history.
    pub alerts: Vec<AlertEntry>,
}

/// Row shape shared by the story cache and alert history queries.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct StoryRow {
    pub title: String,
    pub link: String,
    pub image: String,
    pub published: Option<String>,
}

impl StoryRow {
    pub(crate) fn into_story(self) -> Story {
        Story {
            title: self.title,
            link: self.link,
            image: self.image,
            published: self
                .published
                .as_deref()
                .and_then(|p| DateTime::parse_from_rfc3339(p).ok())
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }
}
