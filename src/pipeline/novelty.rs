//! Cursor-based novelty detection.
//!
//! Novelty is determined by comparing story links against the persisted
//! per-source cursor, never by timestamp: feeds re-date and re-order entries,
//! but the last-seen link is stable.

use crate::feed::Story;

/// Result of comparing a freshly parsed sequence against the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Novelty {
    /// Genuinely new stories, oldest first, so alerts fire in
    /// chronological order.
    pub fresh: Vec<Story>,
    /// Link the cursor must advance to (the newest record's link).
    pub next_cursor: String,
    /// True when no cursor existed yet for this source.
    pub baseline: bool,
}

/// Compute the subsequence of genuinely new stories.
///
/// Scans `parsed` from newest to oldest, accumulating stories until the
/// record matching `last_seen` is reached; everything from that point on was
/// already processed. The accumulated run is reversed so the oldest new story
/// comes first.
///
/// A missing or empty cursor marks a baseline cycle: the newest link becomes
/// the cursor and zero new stories are emitted, so a fresh install never
/// triggers a notification storm.
///
/// The cursor always advances to `parsed[0].link`, even when nothing is new,
/// which keeps re-runs on an unchanged feed idempotent. Callers skip the
/// cycle on an empty parse; an empty slice here still returns harmlessly.
pub fn detect_new(parsed: &[Story], last_seen: Option<&str>) -> Novelty {
    let next_cursor = parsed.first().map(|s| s.link.clone()).unwrap_or_default();

    let last_seen = match last_seen.filter(|c| !c.is_empty()) {
        Some(cursor) => cursor,
        None => {
            return Novelty {
                fresh: Vec::new(),
                next_cursor,
                baseline: true,
            }
        }
    };

    let mut fresh: Vec<Story> = parsed
        .iter()
        .take_while(|story| story.link != last_seen)
        .cloned()
        .collect();
    fresh.reverse();

    Novelty {
        fresh,
        next_cursor,
        baseline: false,
    }
}
