//! User-maintained keyword list: case-preserved, insertion-ordered,
//! case-insensitively unique.

use super::schema::Store;
use super::types::StoreError;

impl Store {
    /// Append a keyword, preserving its case.
    ///
    /// Returns `false` when an equal-ignoring-case keyword already exists
    /// (the stored spelling is kept). Blank input is rejected the same way.
    pub async fn add_keyword(&self, word: &str) -> Result<bool, StoreError> {
        let word = word.trim();
        if word.is_empty() {
            return Ok(false);
        }

        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO keywords (word, word_lower, position)
            VALUES (?, ?, (SELECT COALESCE(MAX(position), -1) + 1 FROM keywords))
        "#,
        )
        .bind(word)
        .bind(word.to_lowercase())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove a keyword by exact stored spelling. Returns `false` when absent.
    pub async fn remove_keyword(&self, word: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM keywords WHERE word = ?")
            .bind(word)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All keywords in insertion order (display order = match order).
    pub async fn keywords(&self) -> Result<Vec<String>, StoreError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT word FROM keywords ORDER BY position")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(|(word,)| word).collect())
    }
}
