//! Fetch collaborator abstraction.
//!
//! Provides a trait-based interface over the services that own progression records:
//! - HTTP (the Lexquest gamification API)
//! - Mock fetcher for testing

pub mod http;
pub mod mock;
pub mod traits;

pub use http::HttpFetcher;
pub use mock::MockFetcher;
pub use traits::{FetchError, ProgressSnapshot, ProgressionFetcher};
