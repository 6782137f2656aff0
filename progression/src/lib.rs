//! Progression and Scoring Engine for Lexquest
//!
//! Pure rules that turn a learner's activity counters into the values the web
//! client renders:
//!
//! - **Levels**: linear XP thresholds, progress bar percentage and level titles
//! - **Badges & streaks**: rarity buckets, "latest N" lists and streak lookup
//! - **Justice Score**: four capped, weighted categories folded into a 0-100 score and tier
//! - **Path gating**: locked / unlocked / completed state for learning-path nodes
//!
//! Every function here is synchronous and side-effect free. Stateful concerns
//! (fetching, caching, events) live in the `progression-session` crate.
//!
//! # Example
//!
//! ```
//! use progression::{compute_justice_score, compute_level_progress, ActivityRecord, UserActivityCounters};
//!
//! let record = ActivityRecord { statutes_read: 50, total_xp: 150, current_level: 2, ..Default::default() };
//! let counters = UserActivityCounters::try_from(record)?;
//!
//! let progress = compute_level_progress(counters.total_xp, counters.current_level)?;
//! assert_eq!(progress.progress_percentage, 50.0);
//!
//! let score = compute_justice_score(&counters, counters.current_level);
//! assert_eq!(score.score, 8);
//! # Ok::<(), progression::ProgressionError>(())
//! ```

pub mod badges;
pub mod level;
pub mod score;
pub mod types;
pub mod unlock;

// Re-export main types
pub use badges::{find_streak, group_badges_by_rarity, latest_badges};
pub use level::{compute_level_progress, level_for_xp, level_title, LevelProgress, XP_PER_LEVEL};
pub use score::{
    compute_justice_score, justice_tier, points_to_next_tier, JusticeScore, JusticeTier,
    ScoreBreakdown,
};
pub use types::*;
pub use unlock::{
    evaluate_nodes, summarize_path, ConfigurationError, LearningPathNode, NodeUnlockState,
    PathProgress,
};
