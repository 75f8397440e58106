//! Alert planning and emission.
//!
//! Planning is pure: given the new stories (oldest first), the keyword set,
//! and the global notifications flag, it decides per story whether to raise a
//! notification and whether the story enters the alert history. Emission is
//! the only side-effecting part and runs strictly after the cycle's state has
//! been committed.

use tokio::time::sleep;

use crate::feed::Story;
use crate::notify::{Notification, Notifier, NOTIFICATION_STAGGER};
use crate::pipeline::keywords::match_keyword;

/// Per-story dispatch decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertPlan {
    pub story: Story,
    /// Keyword that matched the title, if any (case-preserved).
    pub matched: Option<String>,
    /// Whether a notification should be raised for this story.
    pub notify: bool,
}

/// Decide notification eligibility for each new story, oldest first.
///
/// A story notifies when global notifications are enabled, or when it matches
/// a keyword — keyword matches always alert, even with notifications off.
pub fn plan_alerts(
    fresh: &[Story],
    keywords: &[String],
    notifications_enabled: bool,
) -> Vec<AlertPlan> {
    fresh
        .iter()
        .map(|story| {
            let matched = match_keyword(&story.title, keywords).map(str::to_string);
            AlertPlan {
                notify: notifications_enabled || matched.is_some(),
                matched,
                story: story.clone(),
            }
        })
        .collect()
}

/// Emit notifications for the planned alerts, one per stagger interval.
///
/// Only plans with `notify = true` produce a notification. Keyword-matched
/// alerts are marked require-interaction so they stay visible.
pub async fn emit_notifications<N: Notifier>(notifier: &N, plans: &[AlertPlan]) {
    let mut first = true;
    for plan in plans.iter().filter(|p| p.notify) {
        if !first {
            sleep(NOTIFICATION_STAGGER).await;
        }
        first = false;

        let body = match &plan.matched {
            Some(keyword) => format!("Keyword alert: {}", keyword),
            None => "Breaking News".to_string(),
        };
        notifier
            .notify(Notification {
                key: plan.story.link.clone(),
                title: plan.story.title.clone(),
                body,
                image: plan.story.image.clone(),
                require_interaction: plan.matched.is_some(),
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::PLACEHOLDER_IMAGE;
    use std::sync::{Arc, Mutex};

    fn story(title: &str, link: &str) -> Story {
        Story {
            title: title.to_string(),
            link: link.to_string(),
            image: PLACEHOLDER_IMAGE.to_string(),
            published: None,
        }
    }

    #[derive(Clone, Default)]
    struct RecordingNotifier {
        notifications: Arc<Mutex<Vec<Notification>>>,
    }

    impl Notifier for RecordingNotifier {
        async fn notify(&self, notification: Notification) {
            self.notifications.lock().unwrap().push(notification);
        }
        async fn set_badge(&self, _text: &str, _color: &str) {}
    }

    #[test]
    fn test_all_notify_when_enabled() {
        let fresh = vec![story("Plain headline one", "https://x/a")];
        let plans = plan_alerts(&fresh, &[], true);
        assert!(plans[0].notify);
        assert_eq!(plans[0].matched, None);
    }

    #[test]
    fn test_keyword_override_when_disabled() {
        let fresh = vec![
            story("Cricket final tonight", "https://x/a"),
            story("Unrelated headline", "https://x/b"),
        ];
        let keywords = vec!["cricket".to_string()];
        let plans = plan_alerts(&fresh, &keywords, false);

        assert!(plans[0].notify, "keyword match must alert despite flag");
        assert_eq!(plans[0].matched.as_deref(), Some("cricket"));
        assert!(!plans[1].notify, "non-match must stay silent");
        assert_eq!(plans[1].matched, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_emission_staggered_and_filtered() {
        let notifier = RecordingNotifier::default();
        let fresh = vec![
            story("Cricket final tonight", "https://x/a"),
            story("Silent headline", "https://x/b"),
            story("Cricket scores update", "https://x/c"),
        ];
        let keywords = vec!["cricket".to_string()];
        let plans = plan_alerts(&fresh, &keywords, false);

        let started = tokio::time::Instant::now();
        emit_notifications(&notifier, &plans).await;

        // Two eligible notifications, one stagger gap between them.
        let emitted = notifier.notifications.lock().unwrap();
        assert_eq!(emitted.len(), 2);
        assert_eq!(emitted[0].key, "https://x/a");
        assert_eq!(emitted[1].key, "https://x/c");
        assert!(emitted[0].require_interaction);
        assert_eq!(started.elapsed(), NOTIFICATION_STAGGER);
    }

    #[tokio::test]
    async fn test_no_eligible_plans_emit_nothing() {
        let notifier = RecordingNotifier::default();
        let plans = plan_alerts(&[story("Quiet headline", "https://x/a")], &[], false);
        emit_notifications(&notifier, &plans).await;
        assert!(notifier.notifications.lock().unwrap().is_empty());
    }
}
