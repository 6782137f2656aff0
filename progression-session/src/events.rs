//! Progression events.
//!
//! When a reload changes the bundle, the store diffs old against new and publishes
//! the result on a [`ProgressEventBus`]. Presentation layers subscribe and decide
//! how to celebrate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::debug;

#[cfg(feature = "typescript")]
use ts_rs::TS;

use progression::{Badge, JusticeTier};

use crate::bundle::ProgressionBundle;

/// Something worth telling the learner about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// The server advanced the user's level
    LevelUp {
        previous_level: u32,
        new_level: u32,
        title: String,
    },
    /// A badge was earned that was not held before
    BadgeEarned { badge: Badge },
    /// The Justice Score crossed into another tier
    TierChanged {
        previous: JusticeTier,
        current: JusticeTier,
        score: u8,
    },
    /// A streak grew
    StreakExtended {
        streak_type: String,
        current_count: u32,
        personal_best: bool,
    },
}

/// An event with delivery metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ProgressEventEnvelope {
    pub id: String,
    pub user_id: String,
    pub emitted_at: DateTime<Utc>,
    pub event: ProgressEvent,
}

impl ProgressEventEnvelope {
    pub fn new(user_id: impl Into<String>, event: ProgressEvent) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            emitted_at: Utc::now(),
            event,
        }
    }
}

/// Events implied by moving from `previous` to `next`.
pub fn diff_bundles(previous: &ProgressionBundle, next: &ProgressionBundle) -> Vec<ProgressEvent> {
    let mut events = Vec::new();

    let old_level = previous.counters.current_level;
    let new_level = next.counters.current_level;
    if new_level > old_level {
        events.push(ProgressEvent::LevelUp {
            previous_level: old_level,
            new_level,
            title: next.level_title.clone(),
        });
    }

    for badge in next.badges.iter().filter(|b| b.is_earned()) {
        let held_before = previous
            .badges
            .iter()
            .any(|b| b.id == badge.id && b.is_earned());
        if !held_before {
            events.push(ProgressEvent::BadgeEarned {
                badge: badge.clone(),
            });
        }
    }

    if previous.justice_score.tier != next.justice_score.tier {
        events.push(ProgressEvent::TierChanged {
            previous: previous.justice_score.tier,
            current: next.justice_score.tier,
            score: next.justice_score.score,
        });
    }

    for streak in &next.streaks {
        let grew = previous
            .streak(&streak.streak_type)
            .map(|old| streak.current_count > old.current_count)
            .unwrap_or(streak.current_count > 0);
        if grew {
            events.push(ProgressEvent::StreakExtended {
                streak_type: streak.streak_type.clone(),
                current_count: streak.current_count,
                personal_best: streak.is_personal_best(),
            });
        }
    }

    events
}

/// Broadcast bus for progression events.
///
/// Cloning yields another handle to the same channel.
#[derive(Debug, Clone)]
pub struct ProgressEventBus {
    sender: broadcast::Sender<ProgressEventEnvelope>,
}

impl ProgressEventBus {
    /// Create a bus buffering `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEventEnvelope> {
        self.sender.subscribe()
    }

    /// Subscribe as a stream. Events missed by a lagging consumer are skipped.
    pub fn stream(&self) -> impl Stream<Item = ProgressEventEnvelope> + Send + 'static {
        BroadcastStream::new(self.sender.subscribe()).filter_map(|item| item.ok())
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publish events for a user. Returns how many were delivered to at least one subscriber.
    pub fn publish(&self, user_id: &str, events: Vec<ProgressEvent>) -> usize {
        let mut delivered = 0;
        for event in events {
            debug!(user_id = %user_id, event = ?event, "Publishing progress event");
            if self
                .sender
                .send(ProgressEventEnvelope::new(user_id, event))
                .is_ok()
            {
                delivered += 1;
            }
        }
        delivered
    }
}

impl Default for ProgressEventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::ProgressSnapshot;
    use chrono::TimeZone;
    use progression::{ActivityRecord, BadgeRarity, Streak};

    fn catalogue_badge(id: &str) -> Badge {
        Badge {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            icon: String::new(),
            rarity: BadgeRarity::Common,
            earned_at: None,
        }
    }

    fn badge(id: &str) -> Badge {
        Badge {
            earned_at: Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()),
            ..catalogue_badge(id)
        }
    }

    /// A learner with maxed knowledge (40 points) plus whatever the level adds.
    fn snapshot(level: i64, xp: i64, badges: &[&str], streak: u32) -> ProgressSnapshot {
        ProgressSnapshot {
            stats: ActivityRecord {
                statutes_read: 100,
                myths_read: 50,
                learning_paths_completed: 10,
                total_xp: xp,
                current_level: level,
                ..Default::default()
            },
            badges: badges.iter().map(|id| badge(id)).collect(),
            streaks: vec![Streak {
                streak_type: "daily_login".to_string(),
                display_name: "Daily Login".to_string(),
                current_count: streak,
                best_count: streak.max(4),
            }],
        }
    }

    fn bundle(level: i64, xp: i64, badges: &[&str], streak: u32) -> ProgressionBundle {
        ProgressionBundle::derive(&snapshot(level, xp, badges, streak), 3).unwrap()
    }

    fn has_tier_change(events: &[ProgressEvent]) -> bool {
        events
            .iter()
            .any(|e| matches!(e, ProgressEvent::TierChanged { .. }))
    }

    #[test]
    fn test_no_events_for_identical_bundles() {
        let a = bundle(3, 250, &["b1"], 2);
        assert!(diff_bundles(&a, &a.clone()).is_empty());
    }

    #[test]
    fn test_level_badge_and_streak_events() {
        let before = bundle(3, 250, &["b1"], 2);
        let after = bundle(4, 320, &["b1", "b2"], 3);

        let events = diff_bundles(&before, &after);
        assert!(events.contains(&ProgressEvent::LevelUp {
            previous_level: 3,
            new_level: 4,
            title: "Legal Novice".to_string(),
        }));
        assert!(events
            .iter()
            .any(|e| matches!(e, ProgressEvent::BadgeEarned { badge } if badge.id == "b2")));
        assert!(events.contains(&ProgressEvent::StreakExtended {
            streak_type: "daily_login".to_string(),
            current_count: 3,
            personal_best: false,
        }));
    }

    #[test]
    fn test_badge_earned_when_catalogue_entry_is_earned() {
        let mut before = snapshot(3, 250, &[], 0);
        before.badges.push(catalogue_badge("scholar"));
        let before = ProgressionBundle::derive(&before, 3).unwrap();

        let after = bundle(3, 250, &["scholar"], 0);

        let events = diff_bundles(&before, &after);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], ProgressEvent::BadgeEarned { badge } if badge.id == "scholar"));
    }

    #[test]
    fn test_unearned_catalogue_entry_is_silent() {
        let before = bundle(3, 250, &["b1"], 0);
        let mut after = snapshot(3, 250, &["b1"], 0);
        after.badges.push(catalogue_badge("catalogue-only"));
        let after = ProgressionBundle::derive(&after, 3).unwrap();

        assert!(diff_bundles(&before, &after).is_empty());
    }

    #[test]
    fn test_streak_reset_is_silent() {
        let before = bundle(3, 250, &[], 3);
        let after = bundle(3, 250, &[], 0);
        assert!(diff_bundles(&before, &after).is_empty());
    }

    #[test]
    fn test_tier_change_event() {
        // 40.2 -> 40, Rights Learner
        let before = bundle(1, 0, &[], 0);
        assert_eq!(before.justice_score.tier, JusticeTier::RightsLearner);

        // Level 25 adds 4.8 points: 45, still Rights Learner
        let same_tier = bundle(25, 2_450, &[], 0);
        assert_eq!(same_tier.justice_score.score, 45);
        assert!(!has_tier_change(&diff_bundles(&before, &same_tier)));

        // A 30-day streak adds 10 more: 55, Legal Scholar
        let mut promoted = snapshot(25, 2_450, &[], 0);
        promoted.stats.daily_streak = 30;
        let promoted = ProgressionBundle::derive(&promoted, 3).unwrap();

        let events = diff_bundles(&before, &promoted);
        assert!(events.contains(&ProgressEvent::TierChanged {
            previous: JusticeTier::RightsLearner,
            current: JusticeTier::LegalScholar,
            score: 55,
        }));
    }

    #[tokio::test]
    async fn test_bus_without_subscribers() {
        let bus = ProgressEventBus::new(8);
        let delivered = bus.publish(
            "u1",
            vec![ProgressEvent::BadgeEarned {
                badge: badge("nobody-listening"),
            }],
        );
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn test_bus_delivery() {
        let bus = ProgressEventBus::new(8);
        let mut receiver = bus.subscribe();
        let mut stream = Box::pin(bus.stream());
        assert_eq!(bus.subscriber_count(), 2);

        let event = ProgressEvent::LevelUp {
            previous_level: 1,
            new_level: 2,
            title: "Legal Novice".to_string(),
        };
        assert_eq!(bus.publish("u1", vec![event.clone()]), 1);

        let envelope = receiver.recv().await.unwrap();
        assert_eq!(envelope.user_id, "u1");
        assert_eq!(envelope.event, event);

        let streamed = stream.next().await.unwrap();
        assert_eq!(streamed.id, envelope.id);
    }

    #[test]
    fn test_event_wire_format() {
        let json = serde_json::to_value(ProgressEvent::TierChanged {
            previous: JusticeTier::LegalNovice,
            current: JusticeTier::LegalExplorer,
            score: 12,
        })
        .unwrap();
        assert_eq!(json["type"], "tier_changed");
        assert_eq!(json["current"], "legal_explorer");
    }
}
