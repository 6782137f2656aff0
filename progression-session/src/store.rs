//! ProgressionStore - the signed-in user's derived progression state.
//!
//! The store fetches raw records through a [`ProgressionFetcher`], derives a
//! [`ProgressionBundle`] and publishes [`crate::ProgressEvent`]s for whatever changed.
//!
//! Concurrent `load()` calls share one in-flight fetch. Every fetch or ingest takes
//! a sequence number, and a result is applied only if it is newer than the last one
//! applied, so a slow response can never overwrite fresher state.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, info, warn};

use progression::{LearningPathNode, NodeUnlockState, ProgressionError};

use crate::bundle::ProgressionBundle;
use crate::config::SessionConfig;
use crate::events::{diff_bundles, ProgressEventBus, ProgressEventEnvelope};
use crate::fetcher::{FetchError, HttpFetcher, ProgressSnapshot, ProgressionFetcher};

/// Error types for the store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Upstream records could not be fetched
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Records were fetched but failed validation
    #[error("Progression error: {0}")]
    Progression(#[from] ProgressionError),

    /// Nothing has been loaded yet
    #[error("No progression loaded yet")]
    NotLoaded,
}

/// Read-only view of the store for presentation layers.
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    /// Last successfully derived bundle
    pub bundle: Option<Arc<ProgressionBundle>>,
    /// Error from the most recent load, cleared by the next success
    pub last_error: Option<StoreError>,
    /// Sequence number of the last applied result
    pub sequence: u64,
    /// When the bundle was last replaced
    pub loaded_at: Option<DateTime<Utc>>,
}

impl StoreSnapshot {
    pub fn has_error(&self) -> bool {
        self.last_error.is_some()
    }
}

type FetchOutcome = Result<ProgressSnapshot, FetchError>;

struct InFlight {
    seq: u64,
    future: Shared<BoxFuture<'static, FetchOutcome>>,
}

#[derive(Default)]
struct StoreState {
    bundle: Option<Arc<ProgressionBundle>>,
    last_error: Option<StoreError>,
    applied_seq: u64,
    loaded_at: Option<DateTime<Utc>>,
}

impl StoreState {
    /// What callers see right now.
    fn current(&self) -> Result<Arc<ProgressionBundle>, StoreError> {
        match (&self.bundle, &self.last_error) {
            (_, Some(err)) => Err(err.clone()),
            (Some(bundle), None) => Ok(Arc::clone(bundle)),
            (None, None) => Err(StoreError::NotLoaded),
        }
    }
}

/// Holds the derived progression bundle for the signed-in user.
pub struct ProgressionStore {
    /// Configuration
    config: SessionConfig,
    /// Source of raw records
    fetcher: Arc<dyn ProgressionFetcher>,
    /// Where progression events are published
    events: ProgressEventBus,
    /// Last applied state
    state: Arc<RwLock<StoreState>>,
    /// Fetch currently shared by all loaders
    in_flight: Arc<Mutex<Option<InFlight>>>,
    /// Last sequence number handed out
    next_seq: AtomicU64,
}

impl ProgressionStore {
    /// Create a new store with its own event bus.
    pub fn new(fetcher: Arc<dyn ProgressionFetcher>, config: SessionConfig) -> Self {
        let events = ProgressEventBus::new(config.event_channel_capacity);
        Self {
            config,
            fetcher,
            events,
            state: Arc::new(RwLock::new(StoreState::default())),
            in_flight: Arc::new(Mutex::new(None)),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Create a store backed by the HTTP fetcher described in `config`.
    pub fn from_config(config: SessionConfig) -> Result<Self, StoreError> {
        let fetcher = HttpFetcher::from_config(&config.fetcher)?;
        Ok(Self::new(Arc::new(fetcher), config))
    }

    /// Publish events on a shared bus instead of the store's own.
    pub fn with_event_bus(mut self, events: ProgressEventBus) -> Self {
        self.events = events;
        self
    }

    /// Get the user ID.
    pub fn user_id(&self) -> &str {
        &self.config.user_id
    }

    /// The bus progression events are published on.
    pub fn events(&self) -> &ProgressEventBus {
        &self.events
    }

    /// Subscribe to progression events.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEventEnvelope> {
        self.events.subscribe()
    }

    /// Fetch records and rebuild the bundle.
    ///
    /// On failure the previous bundle stays in place and the error is recorded in
    /// [`StoreSnapshot::last_error`].
    pub async fn load(&self) -> Result<Arc<ProgressionBundle>, StoreError> {
        let (seq, future) = self.join_or_start_fetch().await;
        let outcome = future.await;
        self.apply(seq, outcome).await
    }

    /// Reload after an action expected to change the counters.
    pub async fn refresh(&self) -> Result<Arc<ProgressionBundle>, StoreError> {
        info!(user_id = %self.config.user_id, "Refreshing progression");
        self.load().await
    }

    /// Apply records pushed by the caller, e.g. returned from an activity endpoint.
    pub async fn ingest(&self, snapshot: ProgressSnapshot) -> Result<Arc<ProgressionBundle>, StoreError> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(user_id = %self.config.user_id, seq, "Ingesting pushed progression");
        self.apply(seq, Ok(snapshot)).await
    }

    /// Current state of the store.
    pub async fn snapshot(&self) -> StoreSnapshot {
        let state = self.state.read().await;
        StoreSnapshot {
            bundle: state.bundle.clone(),
            last_error: state.last_error.clone(),
            sequence: state.applied_seq,
            loaded_at: state.loaded_at,
        }
    }

    /// Last successfully derived bundle.
    pub async fn bundle(&self) -> Option<Arc<ProgressionBundle>> {
        self.state.read().await.bundle.clone()
    }

    /// Error from the most recent load.
    pub async fn last_error(&self) -> Option<StoreError> {
        self.state.read().await.last_error.clone()
    }

    /// Check if a fetch is in flight.
    pub async fn is_loading(&self) -> bool {
        self.in_flight.lock().await.is_some()
    }

    /// Evaluate a learning path against the loaded XP.
    pub async fn evaluate_path(
        &self,
        nodes: &[LearningPathNode],
    ) -> Result<BTreeMap<String, NodeUnlockState>, StoreError> {
        let bundle = self.bundle().await.ok_or(StoreError::NotLoaded)?;
        Ok(bundle.evaluate_path(nodes)?)
    }

    /// Join the in-flight fetch, or start one.
    async fn join_or_start_fetch(&self) -> (u64, Shared<BoxFuture<'static, FetchOutcome>>) {
        let mut in_flight = self.in_flight.lock().await;

        if let Some(current) = in_flight.as_ref() {
            debug!(user_id = %self.config.user_id, seq = current.seq, "Joining in-flight fetch");
            return (current.seq, current.future.clone());
        }

        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let fetcher = Arc::clone(&self.fetcher);
        let user_id = self.config.user_id.clone();

        info!(user_id = %user_id, seq, fetcher = fetcher.id(), "Loading progression");

        let slot = Arc::downgrade(&self.in_flight);
        let future = async move {
            let outcome = fetcher.fetch(&user_id).await;
            release_fetch(&slot, seq).await;
            outcome
        }
        .boxed()
        .shared();
        *in_flight = Some(InFlight {
            seq,
            future: future.clone(),
        });

        (seq, future)
    }

    /// Apply the outcome of request `seq` unless something newer already landed.
    async fn apply(
        &self,
        seq: u64,
        outcome: FetchOutcome,
    ) -> Result<Arc<ProgressionBundle>, StoreError> {
        let user_id = self.config.user_id.as_str();
        let mut state = self.state.write().await;

        if seq < state.applied_seq {
            debug!(user_id = %user_id, seq, applied = state.applied_seq, "Discarding stale progression response");
            return state.current();
        }
        if seq == state.applied_seq {
            // Another caller sharing this fetch applied it first
            return state.current();
        }

        state.applied_seq = seq;

        let derived = outcome.map_err(StoreError::from).and_then(|snapshot| {
            ProgressionBundle::derive(&snapshot, self.config.latest_badge_count)
                .map_err(StoreError::from)
        });

        match derived {
            Ok(bundle) => {
                let events = state
                    .bundle
                    .as_deref()
                    .map(|previous| diff_bundles(previous, &bundle))
                    .unwrap_or_default();

                info!(
                    user_id = %user_id,
                    seq,
                    level = bundle.counters.current_level,
                    justice_score = bundle.justice_score.score,
                    events = events.len(),
                    "Progression loaded"
                );

                let bundle = Arc::new(bundle);
                state.bundle = Some(Arc::clone(&bundle));
                state.last_error = None;
                state.loaded_at = Some(Utc::now());

                // Published under the lock so subscribers see events in sequence order
                self.events.publish(user_id, events);
                Ok(bundle)
            }
            Err(err) => {
                warn!(user_id = %user_id, seq, error = %err, "Progression load failed, keeping last known state");
                state.last_error = Some(err.clone());
                Err(err)
            }
        }
    }
}

/// Release the in-flight slot if it still holds `seq`.
///
/// Runs inside the shared fetch, so the slot is freed even when every caller
/// is dropped before applying the outcome.
async fn release_fetch(slot: &Weak<Mutex<Option<InFlight>>>, seq: u64) {
    let Some(slot) = slot.upgrade() else {
        return;
    };
    let mut in_flight = slot.lock().await;
    if in_flight.as_ref().map(|f| f.seq) == Some(seq) {
        *in_flight = None;
    }
}
