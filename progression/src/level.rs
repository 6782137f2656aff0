//! XP and level calculations.
//!
//! Levels are linear: level `L` spans `[(L - 1) * 100, L * 100)` XP.

use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::types::{ProgressionError, Result};

/// XP needed to clear one level.
pub const XP_PER_LEVEL: u64 = 100;

/// Level titles, highest threshold first.
const LEVEL_TITLES: &[(u32, &str)] = &[
    (50, "Legal Deity"),
    (40, "Supreme Jurist"),
    (30, "Legal Legend"),
    (25, "Justice Champion"),
    (20, "Legal Expert"),
    (15, "Rights Advocate"),
    (10, "Statute Master"),
    (5, "Legal Scholar"),
];

const DEFAULT_TITLE: &str = "Legal Novice";

/// Progress through the current level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct LevelProgress {
    /// Level as recorded by the server
    pub current_level: u32,
    /// Cumulative XP
    pub current_xp: u64,
    /// XP at which the current level is cleared
    pub next_level_xp: u64,
    /// Percentage of the current level cleared, in [0, 100]
    pub progress_percentage: f64,
    /// XP has reached the threshold but the server has not advanced the level yet
    pub level_up_pending: bool,
}

impl LevelProgress {
    /// XP still needed to clear the current level.
    pub fn xp_to_next_level(&self) -> u64 {
        self.next_level_xp.saturating_sub(self.current_xp)
    }

    pub fn title(&self) -> &'static str {
        level_title(self.current_level)
    }
}

/// Compute progress through `current_level` for a user holding `total_xp`.
///
/// The percentage is clamped to [0, 100], so XP beyond the threshold reads as a
/// full bar until the server records the level-up.
pub fn compute_level_progress(total_xp: u64, current_level: u32) -> Result<LevelProgress> {
    if current_level == 0 {
        return Err(ProgressionError::InvalidInput(
            "current_level must be at least 1, got 0".to_string(),
        ));
    }

    let next_level_xp = u64::from(current_level) * XP_PER_LEVEL;
    let floor_xp = u64::from(current_level - 1) * XP_PER_LEVEL;
    let span = next_level_xp.saturating_sub(floor_xp).max(1);

    let gained = total_xp as f64 - floor_xp as f64;
    let progress_percentage = (gained / span as f64 * 100.0).clamp(0.0, 100.0);

    Ok(LevelProgress {
        current_level,
        current_xp: total_xp,
        next_level_xp,
        progress_percentage,
        level_up_pending: total_xp >= next_level_xp,
    })
}

/// Title shown for a level.
pub fn level_title(level: u32) -> &'static str {
    LEVEL_TITLES
        .iter()
        .find(|(min_level, _)| level >= *min_level)
        .map(|(_, title)| *title)
        .unwrap_or(DEFAULT_TITLE)
}

/// The level implied by `total_xp` under the linear threshold.
pub fn level_for_xp(total_xp: u64) -> u32 {
    let level = total_xp / XP_PER_LEVEL + 1;
    u32::try_from(level).unwrap_or(u32::MAX)
}
