//! Notification surface.
//!
//! The pipeline talks to an injected [`Notifier`] rather than a concrete
//! notification backend, so tests can record emissions and a desktop frontend
//! can be swapped in without touching the core. The default implementation is
//! log-backed: it tracks active notifications and expires them on a
//! best-effort timer, mirroring an auto-dismissing popup.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Badge background used while unread alerts are pending.
pub const ALERT_BADGE_COLOR: &str = "#D32F2F";

/// Delay between consecutive notifications in one cycle, so a burst of new
/// stories does not overwhelm the user.
pub const NOTIFICATION_STAGGER: Duration = Duration::from_secs(1);

/// How long an unattended notification stays active before auto-dismissal.
pub const NOTIFICATION_DISMISS: Duration = Duration::from_secs(6);

/// Saturation point for the badge display; the stored counter stays exact.
const BADGE_CAP: i64 = 99;

/// Render the unread counter for badge display: empty at zero, exact up to
/// the cap, "99+" beyond it.
pub fn format_badge(unread: i64) -> String {
    if unread <= 0 {
        String::new()
    } else if unread > BADGE_CAP {
        format!("{}+", BADGE_CAP)
    } else {
        unread.to_string()
    }
}

/// One user-facing notification, keyed by the story link so click-through can
/// resolve the target URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Story link; `"#"` when unresolvable (such notifications are inert).
    pub key: String,
    pub title: String,
    pub body: String,
    pub image: String,
    /// Keyword alerts stay on screen until acted on.
    pub require_interaction: bool,
}

/// Sink for user-facing alerts and the unread badge.
pub trait Notifier {
    fn notify(&self, notification: Notification) -> impl std::future::Future<Output = ()> + Send;
    fn set_badge(&self, text: &str, color: &str) -> impl std::future::Future<Output = ()> + Send;
}

/// Log-backed notifier with best-effort auto-dismiss.
#[derive(Clone, Default)]
pub struct LogNotifier {
    active: Arc<Mutex<HashMap<String, Notification>>>,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of notifications not yet dismissed. Diagnostic only.
    pub fn active_count(&self) -> usize {
        self.active.lock().map(|m| m.len()).unwrap_or(0)
    }
}

impl Notifier for LogNotifier {
    async fn notify(&self, notification: Notification) {
        tracing::info!(
            key = %notification.key,
            title = %notification.title,
            require_interaction = notification.require_interaction,
            "Notification raised"
        );

        if notification.require_interaction {
            return;
        }

        let key = notification.key.clone();
        if let Ok(mut active) = self.active.lock() {
            active.insert(key.clone(), notification);
        }

        // Best-effort auto-dismiss; a stale entry left behind is not an error.
        let active = Arc::clone(&self.active);
        tokio::spawn(async move {
            tokio::time::sleep(NOTIFICATION_DISMISS).await;
            if let Ok(mut active) = active.lock() {
                if active.remove(&key).is_some() {
                    tracing::debug!(key = %key, "Notification auto-dismissed");
                }
            }
        });
    }

    async fn set_badge(&self, text: &str, color: &str) {
        tracing::debug!(text = %text, color = %color, "Badge updated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_badge_empty_at_zero() {
        assert_eq!(format_badge(0), "");
        assert_eq!(format_badge(-3), "");
    }

    #[test]
    fn test_badge_exact_below_cap() {
        assert_eq!(format_badge(1), "1");
        assert_eq!(format_badge(99), "99");
    }

    #[test]
    fn test_badge_saturates_above_cap() {
        assert_eq!(format_badge(100), "99+");
        assert_eq!(format_badge(1234), "99+");
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_dismiss_clears_active_entry() {
        let notifier = LogNotifier::new();
        notifier
            .notify(Notification {
                key: "https://x/a".into(),
                title: "Headline".into(),
                body: "Body".into(),
                image: "assets/story-placeholder.png".into(),
                require_interaction: false,
            })
            .await;
        assert_eq!(notifier.active_count(), 1);

        tokio::time::sleep(NOTIFICATION_DISMISS + Duration::from_millis(10)).await;
        // Let the spawned dismiss task run.
        tokio::task::yield_now().await;
        assert_eq!(notifier.active_count(), 0);
    }

    #[tokio::test]
    async fn test_require_interaction_is_not_tracked_for_dismiss() {
        let notifier = LogNotifier::new();
        notifier
            .notify(Notification {
                key: "https://x/a".into(),
                title: "Keyword alert".into(),
                body: "Body".into(),
                image: "assets/story-placeholder.png".into(),
                require_interaction: true,
            })
            .await;
        assert_eq!(notifier.active_count(), 0);
    }
}
