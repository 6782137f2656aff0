//! The derived progression bundle.
//!
//! A bundle is always rebuilt from a full [`ProgressSnapshot`]; nothing in it is
//! patched incrementally.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[cfg(feature = "typescript")]
use ts_rs::TS;

use progression::{
    compute_justice_score, compute_level_progress, evaluate_nodes, find_streak,
    group_badges_by_rarity, latest_badges, Badge, BadgeRarity, JusticeScore,
    LearningPathNode, LevelProgress, NodeUnlockState, ProgressionError, Streak,
    UserActivityCounters,
};

use crate::fetcher::ProgressSnapshot;

/// Everything the presentation layer renders for the signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ProgressionBundle {
    /// Validated counters
    pub counters: UserActivityCounters,
    /// Level progress bar
    pub level_progress: LevelProgress,
    /// Title for the current level
    pub level_title: String,
    /// Badges in server order
    pub badges: Vec<Badge>,
    /// Badges grouped by rarity
    pub badges_by_rarity: BTreeMap<BadgeRarity, Vec<Badge>>,
    /// Most recently earned badges, newest first
    pub latest_badges: Vec<Badge>,
    /// Streak counters
    pub streaks: Vec<Streak>,
    /// Composite Justice Score
    pub justice_score: JusticeScore,
    /// SHA-256 over the fields above
    pub fingerprint: String,
}

/// Borrowed view of the hashed fields.
#[derive(Serialize)]
struct Fingerprinted<'a> {
    counters: &'a UserActivityCounters,
    level_progress: &'a LevelProgress,
    level_title: &'a str,
    badges: &'a [Badge],
    streaks: &'a [Streak],
    justice_score: &'a JusticeScore,
    latest_badge_ids: Vec<&'a str>,
}

impl ProgressionBundle {
    /// Derive a bundle from raw records.
    pub fn derive(
        snapshot: &ProgressSnapshot,
        latest_badge_count: usize,
    ) -> Result<Self, ProgressionError> {
        let counters = UserActivityCounters::try_from(snapshot.stats.clone())?;
        for streak in &snapshot.streaks {
            streak.validate()?;
        }

        let level_progress = compute_level_progress(counters.total_xp, counters.current_level)?;
        let justice_score = compute_justice_score(&counters, counters.current_level);
        let latest = latest_badges(&snapshot.badges, latest_badge_count);

        let fingerprint = compute_fingerprint(&Fingerprinted {
            counters: &counters,
            level_progress: &level_progress,
            level_title: level_progress.title(),
            badges: &snapshot.badges,
            streaks: &snapshot.streaks,
            justice_score: &justice_score,
            latest_badge_ids: latest.iter().map(|b| b.id.as_str()).collect(),
        })?;

        Ok(Self {
            counters,
            level_progress,
            level_title: level_progress.title().to_string(),
            badges: snapshot.badges.clone(),
            badges_by_rarity: group_badges_by_rarity(&snapshot.badges),
            latest_badges: latest,
            streaks: snapshot.streaks.clone(),
            justice_score,
            fingerprint,
        })
    }

    /// Find a streak by type.
    pub fn streak(&self, streak_type: &str) -> Option<&Streak> {
        find_streak(&self.streaks, streak_type)
    }

    /// Evaluate a learning path against this bundle's XP.
    pub fn evaluate_path(
        &self,
        nodes: &[LearningPathNode],
    ) -> Result<BTreeMap<String, NodeUnlockState>, ProgressionError> {
        Ok(evaluate_nodes(nodes, self.counters.total_xp)?)
    }
}

fn compute_fingerprint(fields: &Fingerprinted<'_>) -> Result<String, ProgressionError> {
    let json = serde_json::to_vec(fields)
        .map_err(|e| ProgressionError::InvalidInput(format!("Unserializable bundle: {e}")))?;
    let mut hasher = Sha256::new();
    hasher.update(&json);
    Ok(hex::encode(hasher.finalize()))
}
