//! One polling cycle for one feed source.
//!
//! A cycle is atomic from request to commit: fetch, scrape, detect novelty,
//! plan alerts, then apply every state mutation in a single store
//! transaction. Notifications are emitted only after the commit succeeds, so
//! a persistence failure can never alert on state that was not recorded.

use thiserror::Error;

use crate::config::FeedSource;
use crate::feed::{fetch_raw, parse_stories, FetchError};
use crate::notify::{format_badge, Notifier, ALERT_BADGE_COLOR};
use crate::pipeline::dispatcher::{emit_notifications, plan_alerts};
use crate::pipeline::novelty::detect_new;
use crate::storage::{AlertEntry, CycleCommit, Store, StoreError};

/// Why a cycle for one source was abandoned.
///
/// Either way the source is retried on the next scheduled tick, and other
/// sources are unaffected.
#[derive(Debug, Error)]
pub enum CycleError {
    /// Transport failure: skip this cycle, no state mutation.
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// Persistence failure: dispatch aborted rather than risk partial state.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Summary of one completed cycle, for logging and tests.
#[derive(Debug)]
pub struct CycleOutcome {
    pub fetched: usize,
    pub fresh: usize,
    pub alerted: usize,
    pub baseline: bool,
}

/// Poll one source end to end.
///
/// An empty parse (no valid fragments) leaves all state untouched — the feed
/// was truncated or replaced with garbage, and advancing the cursor on it
/// would lose stories.
pub async fn run_cycle<N: Notifier>(
    store: &Store,
    client: &reqwest::Client,
    notifier: &N,
    source: &FeedSource,
) -> Result<CycleOutcome, CycleError> {
    let raw = fetch_raw(client, &source.url).await?;
    let stories = parse_stories(&raw);
    if stories.is_empty() {
        tracing::debug!(source = %source.name, "No parsable stories, skipping cycle");
        return Ok(CycleOutcome {
            fetched: 0,
            fresh: 0,
            alerted: 0,
            baseline: false,
        });
    }

    let cursor = store.cursor(&source.name).await?;
    let novelty = detect_new(&stories, cursor.as_deref());

    let keywords = store.keywords().await?;
    let notifications_enabled = store.notifications_enabled().await?;
    let plans = plan_alerts(&novelty.fresh, &keywords, notifications_enabled);

    let alerts: Vec<AlertEntry> = plans
        .iter()
        .filter_map(|p| {
            p.matched
                .as_deref()
                .map(|keyword| AlertEntry::from_story(&p.story, keyword))
        })
        .collect();
    let alerted = alerts.len();

    let unread_total = store
        .commit_cycle(&CycleCommit {
            source: &source.name,
            stories: &stories,
            next_cursor: &novelty.next_cursor,
            unread_delta: novelty.fresh.len() as i64,
            alerts,
        })
        .await?;

    notifier
        .set_badge(&format_badge(unread_total), ALERT_BADGE_COLOR)
        .await;
    emit_notifications(notifier, &plans).await;

    Ok(CycleOutcome {
        fetched: stories.len(),
        fresh: novelty.fresh.len(),
        alerted,
        baseline: novelty.baseline,
    })
}
