// =============================================================================
// Fetch State — per-source status machine with newest-request-wins writes
// =============================================================================
//
// Every remote source owns exactly one `StateCell`. A fetch attempt calls
// `begin()` to obtain a request sequence number, performs its I/O, then calls
// `complete(seq, result)`. The result is applied only when `seq` is still the
// latest sequence issued; anything older is silently discarded. Stopping a
// poller (or changing the series timeframe) calls `invalidate()`, which bumps
// the sequence so every in-flight request becomes stale on arrival.
//
// This replaces completion-order ("last response wins") semantics, which race
// under slow or out-of-order network responses.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use thiserror::Error;

// =============================================================================
// Error taxonomy
// =============================================================================

/// Classified failure of a single fetch attempt.
///
/// Transport problems and malformed payloads are distinct from a well-formed
/// response in which the prediction service reports it cannot serve.
#[derive(Debug, Clone, Error, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum FetchError {
    /// DNS failure, connection refused, timeout, non-2xx status.
    #[error("network error: {0}")]
    Network(String),

    /// Response arrived but did not have the expected shape.
    #[error("parse error: {0}")]
    Parse(String),

    /// The prediction service answered with `success: false`.
    #[error("prediction unavailable: {0}")]
    PredictionUnavailable(String),
}

impl FetchError {
    /// Stable label for logs and assertions.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Parse(_) => "parse",
            Self::PredictionUnavailable(_) => "prediction_unavailable",
        }
    }

    /// Classify a `reqwest` transport/decode error.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

// =============================================================================
// FetchState
// =============================================================================

/// Lifecycle phase of a source's current data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    Idle,
    Loading,
    Ready,
    Failed,
}

/// Snapshot of one source: phase, latest good value, latest error.
///
/// Invariants: `Ready` implies `value` is set, `Failed` implies `error` is
/// set, and applying a success clears any prior error (and vice versa). While
/// `Loading`, the previous value stays visible until the attempt completes.
#[derive(Debug, Clone, Serialize)]
pub struct FetchState<T> {
    pub status: FetchStatus,
    pub value: Option<T>,
    pub error: Option<FetchError>,
    /// Epoch milliseconds of the last applied completion (success or failure).
    pub last_updated_at: Option<i64>,
}

impl<T> FetchState<T> {
    fn idle() -> Self {
        Self {
            status: FetchStatus::Idle,
            value: None,
            error: None,
            last_updated_at: None,
        }
    }
}

// =============================================================================
// StateCell
// =============================================================================

/// Owned fetch state plus the request sequence that gates writes to it.
///
/// Applied writes bump the shared `version` counter so consumers of the
/// dashboard snapshot can detect changes without diffing payloads.
pub struct StateCell<T> {
    state: RwLock<FetchState<T>>,
    seq: AtomicU64,
    version: Arc<AtomicU64>,
}

impl<T: Clone> StateCell<T> {
    /// Create an idle cell wired to the global state-version counter.
    pub fn new(version: Arc<AtomicU64>) -> Self {
        Self {
            state: RwLock::new(FetchState::idle()),
            seq: AtomicU64::new(0),
            version,
        }
    }

    /// Issue a new request sequence number and mark the cell Loading.
    ///
    /// The previous value/error remain in place until a completion is applied.
    pub fn begin(&self) -> u64 {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.write().status = FetchStatus::Loading;
        self.version.fetch_add(1, Ordering::SeqCst);
        seq
    }

    /// Apply a completion if `seq` is still the newest issued request.
    ///
    /// Returns `true` when the result was applied. A stale sequence (an older
    /// request, or any request issued before the last `invalidate`) leaves the
    /// state untouched.
    pub fn complete(&self, seq: u64, result: Result<T, FetchError>) -> bool {
        let mut state = self.state.write();
        // Re-check under the write lock so a concurrent begin/invalidate
        // cannot slip between the comparison and the write.
        if seq != self.seq.load(Ordering::SeqCst) {
            return false;
        }

        let now = chrono::Utc::now().timestamp_millis();
        match result {
            Ok(value) => {
                state.status = FetchStatus::Ready;
                state.value = Some(value);
                state.error = None;
            }
            Err(err) => {
                state.status = FetchStatus::Failed;
                state.value = None;
                state.error = Some(err);
            }
        }
        state.last_updated_at = Some(now);
        drop(state);

        self.version.fetch_add(1, Ordering::SeqCst);
        true
    }

    /// Invalidate every request currently in flight.
    ///
    /// Called when a poller stops or when the request parameters change
    /// identity (series timeframe switch).
    pub fn invalidate(&self) {
        self.seq.fetch_add(1, Ordering::SeqCst);
    }

    /// Clone the current state for the dashboard snapshot.
    pub fn snapshot(&self) -> FetchState<T> {
        self.state.read().clone()
    }
}
