//! Progression Session - stateful progression for the signed-in user
//!
//! Wraps the pure `progression` engine with:
//! - Trait-based fetch collaborators (HTTP gamification API, mock)
//! - A store that coalesces concurrent loads and ignores stale responses
//! - Last-known-good state with an error flag instead of zeroed values
//! - Progress events (level up, badge earned, tier change, streak) on a broadcast bus
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          ProgressionStore               │
//! │  (load / refresh / ingest / snapshot)   │
//! └────────────────┬────────────────────────┘
//!                  │
//!      ┌───────────┼───────────────┐
//!      ▼           ▼               ▼
//! ┌───────────┐ ┌──────────────┐ ┌──────────────┐
//! │Progression│ │ Progression  │ │ ProgressEvent│
//! │ Fetcher   │ │ Bundle       │ │ Bus          │
//! │(HTTP/Mock)│ │ (engine)     │ │ (broadcast)  │
//! └───────────┘ └──────────────┘ └──────────────┘
//! ```

pub mod bundle;
pub mod config;
pub mod events;
pub mod fetcher;
pub mod store;

// Re-export main types for convenience
pub use bundle::ProgressionBundle;
pub use config::{FetcherConfig, SessionConfig};
pub use events::{diff_bundles, ProgressEvent, ProgressEventBus, ProgressEventEnvelope};
pub use fetcher::{FetchError, HttpFetcher, MockFetcher, ProgressSnapshot, ProgressionFetcher};
pub use store::{ProgressionStore, StoreError, StoreSnapshot};
