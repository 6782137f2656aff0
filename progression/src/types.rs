//! Core record types for the progression engine.
//!
//! Raw records arrive from the gamification service as [`ActivityRecord`]s and are
//! validated into [`UserActivityCounters`] before any formula sees them.
//!
//! With the `typescript` feature enabled, these types can be exported to TypeScript
//! using ts-rs for consistency with the web client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::unlock::ConfigurationError;

/// Error types for the progression engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProgressionError {
    /// A record violates a type or range invariant
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A learning path is misconfigured
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

pub type Result<T> = std::result::Result<T, ProgressionError>;

/// Activity counters exactly as received from the gamification service.
///
/// Counts are signed so that malformed records can be reported rather than
/// silently wrapped. Missing counts default to zero and a missing level to 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(default)]
pub struct ActivityRecord {
    pub statutes_read: i64,
    pub myths_read: i64,
    pub learning_paths_completed: i64,
    pub daily_streak: i64,
    pub ai_chats_initiated: i64,
    pub simulations_completed: i64,
    pub questions_asked: i64,
    pub answers_provided: i64,
    pub upvotes_received: i64,
    pub badges_earned: i64,
    pub total_xp: i64,
    pub current_level: i64,
}

impl Default for ActivityRecord {
    fn default() -> Self {
        Self {
            statutes_read: 0,
            myths_read: 0,
            learning_paths_completed: 0,
            daily_streak: 0,
            ai_chats_initiated: 0,
            simulations_completed: 0,
            questions_asked: 0,
            answers_provided: 0,
            upvotes_received: 0,
            badges_earned: 0,
            total_xp: 0,
            current_level: 1,
        }
    }
}

/// Validated activity counters for a single user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct UserActivityCounters {
    /// Statutes opened in the statute browser
    pub statutes_read: u32,
    /// Legal myths read
    pub myths_read: u32,
    /// Learning paths finished end to end
    pub learning_paths_completed: u32,
    /// Consecutive days with activity
    pub daily_streak: u32,
    /// Conversations started with the legal assistant
    pub ai_chats_initiated: u32,
    /// Courtroom simulations finished
    pub simulations_completed: u32,
    /// Community questions posted
    pub questions_asked: u32,
    /// Community answers posted
    pub answers_provided: u32,
    /// Upvotes received on questions and answers
    pub upvotes_received: u32,
    /// Badges earned so far
    pub badges_earned: u32,
    /// Cumulative experience points
    pub total_xp: u64,
    /// Level as recorded by the server (>= 1)
    pub current_level: u32,
}

impl TryFrom<ActivityRecord> for UserActivityCounters {
    type Error = ProgressionError;

    fn try_from(record: ActivityRecord) -> Result<Self> {
        let current_level = count("current_level", record.current_level)?;
        if current_level == 0 {
            return Err(ProgressionError::InvalidInput(
                "current_level must be at least 1, got 0".to_string(),
            ));
        }

        Ok(Self {
            statutes_read: count("statutes_read", record.statutes_read)?,
            myths_read: count("myths_read", record.myths_read)?,
            learning_paths_completed: count(
                "learning_paths_completed",
                record.learning_paths_completed,
            )?,
            daily_streak: count("daily_streak", record.daily_streak)?,
            ai_chats_initiated: count("ai_chats_initiated", record.ai_chats_initiated)?,
            simulations_completed: count("simulations_completed", record.simulations_completed)?,
            questions_asked: count("questions_asked", record.questions_asked)?,
            answers_provided: count("answers_provided", record.answers_provided)?,
            upvotes_received: count("upvotes_received", record.upvotes_received)?,
            badges_earned: count("badges_earned", record.badges_earned)?,
            total_xp: u64::try_from(record.total_xp).map_err(|_| {
                ProgressionError::InvalidInput(format!(
                    "total_xp must be non-negative, got {}",
                    record.total_xp
                ))
            })?,
            current_level,
        })
    }
}

fn count(field: &str, value: i64) -> Result<u32> {
    if value < 0 {
        return Err(ProgressionError::InvalidInput(format!(
            "{field} must be non-negative, got {value}"
        )));
    }
    u32::try_from(value).map_err(|_| {
        ProgressionError::InvalidInput(format!("{field} is out of range, got {value}"))
    })
}

/// Badge rarity, ordered from most to least common.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum BadgeRarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

impl BadgeRarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Rare => "rare",
            Self::Epic => "epic",
            Self::Legendary => "legendary",
        }
    }

    /// All rarities, most common first.
    pub fn all() -> [Self; 4] {
        [Self::Common, Self::Rare, Self::Epic, Self::Legendary]
    }
}

impl Default for BadgeRarity {
    fn default() -> Self {
        Self::Common
    }
}

/// A badge awarded to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Badge {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub rarity: BadgeRarity,
    /// When the badge was earned; absent for catalogue entries not yet earned
    #[serde(default)]
    pub earned_at: Option<DateTime<Utc>>,
}

impl Badge {
    pub fn is_earned(&self) -> bool {
        self.earned_at.is_some()
    }
}

/// A streak counter such as the daily login streak.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Streak {
    pub streak_type: String,
    pub display_name: String,
    pub current_count: u32,
    pub best_count: u32,
}

impl Streak {
    /// Whether the running streak matches the user's best.
    pub fn is_personal_best(&self) -> bool {
        self.current_count > 0 && self.current_count >= self.best_count
    }

    /// Reject streaks whose best is below the running count.
    pub fn validate(&self) -> Result<()> {
        if self.best_count < self.current_count {
            return Err(ProgressionError::InvalidInput(format!(
                "streak '{}' has best_count {} below current_count {}",
                self.streak_type, self.best_count, self.current_count
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_defaults() {
        let record: ActivityRecord = serde_json::from_str(r#"{"statutes_read": 4}"#).unwrap();
        assert_eq!(record.statutes_read, 4);
        assert_eq!(record.current_level, 1);

        let counters = UserActivityCounters::try_from(record).unwrap();
        assert_eq!(counters.statutes_read, 4);
        assert_eq!(counters.total_xp, 0);
        assert_eq!(counters.current_level, 1);
    }

    #[test]
    fn test_negative_count_rejected() {
        let record = ActivityRecord {
            myths_read: -3,
            ..Default::default()
        };
        let err = UserActivityCounters::try_from(record).unwrap_err();
        assert_eq!(
            err,
            ProgressionError::InvalidInput("myths_read must be non-negative, got -3".to_string())
        );
    }

    #[test]
    fn test_level_zero_rejected() {
        let record = ActivityRecord {
            current_level: 0,
            ..Default::default()
        };
        assert!(matches!(
            UserActivityCounters::try_from(record),
            Err(ProgressionError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_negative_xp_rejected() {
        let record = ActivityRecord {
            total_xp: -1,
            current_level: 1,
            ..Default::default()
        };
        let err = UserActivityCounters::try_from(record).unwrap_err();
        assert!(err.to_string().contains("total_xp"));
    }

    #[test]
    fn test_overflowing_count_rejected() {
        let record = ActivityRecord {
            upvotes_received: i64::from(u32::MAX) + 1,
            current_level: 1,
            ..Default::default()
        };
        let err = UserActivityCounters::try_from(record).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_badge_deserialize() {
        let badge: Badge = serde_json::from_str(
            r#"{"id":"b1","name":"First Brief","rarity":"epic","earned_at":"2024-03-01T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(badge.rarity, BadgeRarity::Epic);
        assert!(badge.is_earned());
        assert_eq!(badge.description, "");
    }

    #[test]
    fn test_rarity_order() {
        assert!(BadgeRarity::Common < BadgeRarity::Rare);
        assert!(BadgeRarity::Epic < BadgeRarity::Legendary);
    }

    #[test]
    fn test_streak_validation() {
        let mut streak = Streak {
            streak_type: "daily_login".to_string(),
            display_name: "Daily Login".to_string(),
            current_count: 5,
            best_count: 5,
        };
        assert!(streak.validate().is_ok());
        assert!(streak.is_personal_best());

        streak.best_count = 4;
        assert!(streak.validate().is_err());
    }
}
