//! Mock fetcher for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

use super::traits::*;

/// Mock fetcher for testing.
///
/// Serves a configurable snapshot, can be switched to fail, and can delay
/// responses to exercise concurrent loads.
pub struct MockFetcher {
    fetcher_id: String,
    snapshot: RwLock<ProgressSnapshot>,
    failing: AtomicBool,
    delay_ms: AtomicU64,
    call_count: AtomicU32,
}

impl MockFetcher {
    /// Create a new mock fetcher serving `snapshot`.
    pub fn new(snapshot: ProgressSnapshot) -> Self {
        Self {
            fetcher_id: "mock-fetcher".to_string(),
            snapshot: RwLock::new(snapshot),
            failing: AtomicBool::new(false),
            delay_ms: AtomicU64::new(0),
            call_count: AtomicU32::new(0),
        }
    }

    /// Delay every response.
    pub fn with_delay(self, delay: Duration) -> Self {
        self.delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
        self
    }

    /// Replace the snapshot served from now on.
    pub async fn set_snapshot(&self, snapshot: ProgressSnapshot) {
        *self.snapshot.write().await = snapshot;
    }

    /// Make subsequent fetches fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Get the number of times fetch was called.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Reset the call count.
    pub fn reset_call_count(&self) {
        self.call_count.store(0, Ordering::SeqCst);
    }
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new(ProgressSnapshot::default())
    }
}

#[async_trait]
impl ProgressionFetcher for MockFetcher {
    fn id(&self) -> &str {
        &self.fetcher_id
    }

    async fn fetch(&self, _user_id: &str) -> Result<ProgressSnapshot, FetchError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        let delay_ms = self.delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(FetchError::Unavailable("Mock fetcher disabled".to_string()));
        }

        Ok(self.snapshot.read().await.clone())
    }
}
