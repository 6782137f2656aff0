//! Configuration for a progression session.

use serde::{Deserialize, Serialize};

/// Configuration for a [`crate::ProgressionStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Signed-in user whose progression is loaded
    pub user_id: String,
    /// Buffered events per subscriber before lagging ones drop the oldest
    pub event_channel_capacity: usize,
    /// Size of the bundle's "latest badges" list
    pub latest_badge_count: usize,
    /// Fetch collaborator settings
    pub fetcher: FetcherConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_id: String::new(),
            event_channel_capacity: 64,
            latest_badge_count: 3,
            fetcher: FetcherConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Create a new config for a user.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    /// Load config from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

/// HTTP fetcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Base URL of the gamification API
    pub base_url: Option<String>,
    /// Bearer token for the signed-in session
    pub auth_token: Option<String>,
    /// Request timeout (ms)
    pub timeout_ms: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            auth_token: None,
            timeout_ms: 10_000,
        }
    }
}
