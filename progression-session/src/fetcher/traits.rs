//! Core traits for progression fetchers.
//!
//! This module defines the `ProgressionFetcher` trait - the seam between the
//! session store and whatever service owns the user's gamification records.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

use progression::{ActivityRecord, Badge, Streak};

/// Error types for fetch operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Fetcher is not available
    #[error("Fetcher unavailable: {0}")]
    Unavailable(String),

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// No progression record for the user
    #[error("No progression record for user {0}")]
    NotFound(String),

    /// Non-success HTTP status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Payload did not match the expected shape
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

/// Everything the gamification service reports for one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ProgressSnapshot {
    /// Raw activity counters
    pub stats: ActivityRecord,
    /// Earned badges
    #[serde(default)]
    pub badges: Vec<Badge>,
    /// Streak counters
    #[serde(default)]
    pub streaks: Vec<Streak>,
}

/// Source of progression records.
///
/// Implementations fetch; they never derive. Levels, scores and events are
/// computed by the store from whatever shape is returned here.
#[async_trait]
pub trait ProgressionFetcher: Send + Sync {
    /// Get the fetcher identifier.
    fn id(&self) -> &str;

    /// Fetch the current records for a user.
    async fn fetch(&self, user_id: &str) -> Result<ProgressSnapshot, FetchError>;
}
