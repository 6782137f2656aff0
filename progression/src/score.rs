//! Justice Score composition.
//!
//! The score blends four categories, each capped before weighting so no single
//! counter can dominate:
//!
//! | Category    | Max | Inputs                                              |
//! |-------------|-----|-----------------------------------------------------|
//! | Knowledge   | 40  | statutes read, myths read, learning paths completed |
//! | Engagement  | 30  | daily streak, assistant chats, simulations          |
//! | Community   | 20  | questions, answers, upvotes                         |
//! | Achievement | 10  | level, badges                                       |

use std::fmt;

use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::types::UserActivityCounters;

/// Named band for a Justice Score, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum JusticeTier {
    LegalNovice,
    LegalExplorer,
    JusticeSeeker,
    LegalStudent,
    RightsLearner,
    LegalScholar,
    LawGuardian,
    LegalAdvocate,
    RightsDefender,
    JusticeChampion,
}

impl JusticeTier {
    /// All tiers, highest first.
    pub const DESCENDING: [JusticeTier; 10] = [
        Self::JusticeChampion,
        Self::RightsDefender,
        Self::LegalAdvocate,
        Self::LawGuardian,
        Self::LegalScholar,
        Self::RightsLearner,
        Self::LegalStudent,
        Self::JusticeSeeker,
        Self::LegalExplorer,
        Self::LegalNovice,
    ];

    /// Lowest score that earns this tier.
    pub fn min_score(&self) -> u8 {
        match self {
            Self::JusticeChampion => 90,
            Self::RightsDefender => 80,
            Self::LegalAdvocate => 70,
            Self::LawGuardian => 60,
            Self::LegalScholar => 50,
            Self::RightsLearner => 40,
            Self::LegalStudent => 30,
            Self::JusticeSeeker => 20,
            Self::LegalExplorer => 10,
            Self::LegalNovice => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JusticeChampion => "Justice Champion",
            Self::RightsDefender => "Rights Defender",
            Self::LegalAdvocate => "Legal Advocate",
            Self::LawGuardian => "Law Guardian",
            Self::LegalScholar => "Legal Scholar",
            Self::RightsLearner => "Rights Learner",
            Self::LegalStudent => "Legal Student",
            Self::JusticeSeeker => "Justice Seeker",
            Self::LegalExplorer => "Legal Explorer",
            Self::LegalNovice => "Legal Novice",
        }
    }

    /// Tier for a score, taking the highest threshold the score reaches.
    pub fn from_score(score: u8) -> Self {
        Self::DESCENDING
            .into_iter()
            .find(|tier| score >= tier.min_score())
            .unwrap_or(Self::LegalNovice)
    }

    /// The tier above this one, if any.
    pub fn next(&self) -> Option<Self> {
        let index = Self::DESCENDING.iter().position(|t| t == self)?;
        index.checked_sub(1).map(|i| Self::DESCENDING[i])
    }
}

impl fmt::Display for JusticeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shorthand for [`JusticeTier::from_score`].
pub fn justice_tier(score: u8) -> JusticeTier {
    JusticeTier::from_score(score)
}

/// Points still needed to reach the next tier, `None` at the top tier.
pub fn points_to_next_tier(score: u8) -> Option<u8> {
    JusticeTier::from_score(score)
        .next()
        .map(|next| next.min_score().saturating_sub(score))
}

/// Per-category contributions before rounding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ScoreBreakdown {
    /// Out of 40
    pub knowledge: f64,
    /// Out of 30
    pub engagement: f64,
    /// Out of 20
    pub community: f64,
    /// Out of 10
    pub achievement: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.knowledge + self.engagement + self.community + self.achievement
    }
}

/// Composite 0-100 score with its tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct JusticeScore {
    pub score: u8,
    pub tier: JusticeTier,
    pub breakdown: ScoreBreakdown,
}

/// Fraction of `target` reached, capped at 1.
fn capped(value: u32, target: f64) -> f64 {
    (f64::from(value) / target).min(1.0)
}

/// Compute the Justice Score for a user at `level`.
pub fn compute_justice_score(counters: &UserActivityCounters, level: u32) -> JusticeScore {
    let breakdown = ScoreBreakdown {
        knowledge: capped(counters.statutes_read, 100.0) * 15.0
            + capped(counters.myths_read, 50.0) * 10.0
            + capped(counters.learning_paths_completed, 10.0) * 15.0,
        engagement: capped(counters.daily_streak, 30.0) * 10.0
            + capped(counters.ai_chats_initiated, 50.0) * 10.0
            + capped(counters.simulations_completed, 20.0) * 10.0,
        community: capped(counters.questions_asked, 25.0) * 7.0
            + capped(counters.answers_provided, 25.0) * 8.0
            + capped(counters.upvotes_received, 50.0) * 5.0,
        achievement: capped(level, 25.0) * 5.0 + capped(counters.badges_earned, 20.0) * 5.0,
    };

    // Bounded by construction; the clamp only guards float noise.
    let score = breakdown.total().round().clamp(0.0, 100.0) as u8;

    JusticeScore {
        score,
        tier: JusticeTier::from_score(score),
        breakdown,
    }
}
