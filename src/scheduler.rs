//! Cycle scheduling.
//!
//! A single consumer loop selects over a fixed-period interval and a manual
//! refresh channel, so two cycles for the same source can never run
//! concurrently and persisted state is never read-modify-written by two
//! in-flight cycles. Sources are polled sequentially within a pass; a failure
//! on one source never aborts the others.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use crate::config::FeedSource;
use crate::notify::Notifier;
use crate::pipeline::run_cycle;
use crate::storage::Store;

/// Handle for requesting an out-of-band polling pass.
///
/// `refresh` resolves only once every source has been polled, mirroring a
/// request/response control message with no payload.
#[derive(Clone)]
pub struct RefreshHandle {
    tx: mpsc::Sender<oneshot::Sender<()>>,
}

impl RefreshHandle {
    /// Request an immediate pass over all sources and wait for completion.
    ///
    /// Returns `Err` only when the scheduler has shut down.
    pub async fn refresh(&self) -> Result<(), RefreshClosed> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx.send(ack_tx).await.map_err(|_| RefreshClosed)?;
        ack_rx.await.map_err(|_| RefreshClosed)
    }
}

/// The scheduler loop is no longer running.
#[derive(Debug, thiserror::Error)]
#[error("Scheduler is not running")]
pub struct RefreshClosed;

/// Create the refresh channel pair; pass the receiver to [`run`].
pub fn refresh_channel() -> (RefreshHandle, mpsc::Receiver<oneshot::Sender<()>>) {
    // Small buffer: refresh requests queued while a pass runs are served at
    // fetch-boundary granularity, never interleaved mid-cycle.
    let (tx, rx) = mpsc::channel(8);
    (RefreshHandle { tx }, rx)
}

/// Run the scheduler until the process exits.
///
/// The first pass fires immediately; subsequent passes at `period`. Manual
/// refresh requests are acknowledged after the full pass completes.
pub async fn run<N: Notifier>(
    store: Store,
    client: reqwest::Client,
    notifier: N,
    sources: Vec<FeedSource>,
    period: Duration,
    mut refresh_rx: mpsc::Receiver<oneshot::Sender<()>>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                poll_all(&store, &client, &notifier, &sources).await;
            }
            Some(ack) = refresh_rx.recv() => {
                poll_all(&store, &client, &notifier, &sources).await;
                // Requester may have given up waiting; that is fine.
                let _ = ack.send(());
            }
        }
    }
}

/// Poll every configured source once, sequentially.
pub async fn poll_all<N: Notifier>(
    store: &Store,
    client: &reqwest::Client,
    notifier: &N,
    sources: &[FeedSource],
) {
    for source in sources {
        match run_cycle(store, client, notifier, source).await {
            Ok(outcome) => {
                tracing::info!(
                    source = %source.name,
                    fetched = outcome.fetched,
                    fresh = outcome.fresh,
                    alerted = outcome.alerted,
                    baseline = outcome.baseline,
                    "Cycle complete"
                );
            }
            Err(e) => {
                // Skip this source until the next tick; others still run.
                tracing::warn!(source = %source.name, error = %e, "Cycle failed");
            }
        }
    }
}
