use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::field::fingerprint::FieldFingerprint;
use crate::guidance::cache::GuidanceCache;
use crate::guidance::error::GuidanceError;
use crate::guidance::guidance_model::{GuidanceParseResult, GuidanceRecord};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(20);

// ============================================================================
// Configuration
// ============================================================================

/// What a second request for an in-flight fingerprint does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InFlightPolicy {
    /// Return immediately; a later rescan picks up the cached record.
    #[default]
    Skip,
    /// Wait for the outstanding fetch and share its record.
    Join,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub fetch_timeout: Option<Duration>,
    pub cache_ttl: Option<Duration>,
    pub max_entries: Option<usize>,
    pub in_flight: InFlightPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Some(DEFAULT_FETCH_TIMEOUT),
            cache_ttl: None,
            max_entries: None,
            in_flight: InFlightPolicy::Skip,
        }
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// Result of one `request_guidance` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuidanceOutcome {
    /// Served from the cache; no fetch ran.
    Cached(GuidanceRecord),
    /// Fetched a well-formed record and cached it.
    Fetched(GuidanceRecord),
    /// Fetched a malformed payload; best-effort record.
    Degraded(GuidanceRecord),
    /// Waited on another caller's fetch.
    Joined(GuidanceRecord),
    /// Another fetch for this fingerprint is outstanding; nothing was sent.
    InFlight,
    Failed(GuidanceError),
}

impl GuidanceOutcome {
    pub fn record(&self) -> Option<&GuidanceRecord> {
        match self {
            GuidanceOutcome::Cached(r)
            | GuidanceOutcome::Fetched(r)
            | GuidanceOutcome::Degraded(r)
            | GuidanceOutcome::Joined(r) => Some(r),
            GuidanceOutcome::InFlight | GuidanceOutcome::Failed(_) => None,
        }
    }

    pub fn into_record(self) -> Option<GuidanceRecord> {
        match self {
            GuidanceOutcome::Cached(r)
            | GuidanceOutcome::Fetched(r)
            | GuidanceOutcome::Degraded(r)
            | GuidanceOutcome::Joined(r) => Some(r),
            GuidanceOutcome::InFlight | GuidanceOutcome::Failed(_) => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GuidanceOutcome::Cached(_) => "cached",
            GuidanceOutcome::Fetched(_) => "fetched",
            GuidanceOutcome::Degraded(_) => "degraded",
            GuidanceOutcome::Joined(_) => "joined",
            GuidanceOutcome::InFlight => "in_flight",
            GuidanceOutcome::Failed(_) => "failed",
        }
    }
}

// ============================================================================
// Session
// ============================================================================

#[derive(Debug, Clone)]
enum FetchState {
    Pending,
    Done(Option<GuidanceRecord>),
}

struct InFlightEntry {
    ticket: u64,
    state: watch::Receiver<FetchState>,
}

#[derive(Default)]
struct SessionState {
    cache: GuidanceCache,
    in_flight: HashMap<FieldFingerprint, InFlightEntry>,
    next_ticket: u64,
    disposed: bool,
}

struct SessionInner {
    config: SessionConfig,
    state: Mutex<SessionState>,
    cancel: CancellationToken,
}

/// Page-lifetime guidance cache with at most one fetch per fingerprint.
///
/// Cloning is cheap and every clone shares the same cache and in-flight
/// set. The lock is only taken for short synchronous sections and never
/// across an `.await`, so "check cache, then mark in-flight" is atomic with
/// respect to other tasks.
#[derive(Clone)]
pub struct GuidanceSession {
    inner: Arc<SessionInner>,
}

enum Claim {
    Hit(GuidanceRecord),
    Busy(watch::Receiver<FetchState>),
    Owner(InFlightGuard),
    Disposed,
}

impl GuidanceSession {
    pub fn new(config: SessionConfig) -> Self {
        let cache = GuidanceCache::new(config.cache_ttl, config.max_entries);
        Self {
            inner: Arc::new(SessionInner {
                config,
                state: Mutex::new(SessionState {
                    cache,
                    ..Default::default()
                }),
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Return cached guidance for `fingerprint`, or run `fetch` if no other
    /// caller is already fetching it.
    pub async fn request_guidance<F, Fut, P>(
        &self,
        fingerprint: &FieldFingerprint,
        fetch: F,
    ) -> GuidanceOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<P, GuidanceError>>,
        P: Into<GuidanceParseResult>,
    {
        let token = self.inner.cancel.child_token();
        self.request_guidance_with(fingerprint, token, fetch).await
    }

    /// Like `request_guidance`, aborting the fetch when `cancel` fires.
    pub async fn request_guidance_with<F, Fut, P>(
        &self,
        fingerprint: &FieldFingerprint,
        cancel: CancellationToken,
        fetch: F,
    ) -> GuidanceOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<P, GuidanceError>>,
        P: Into<GuidanceParseResult>,
    {
        let guard = match self.claim(fingerprint) {
            Claim::Hit(record) => {
                debug!(%fingerprint, "guidance cache hit");
                return GuidanceOutcome::Cached(record);
            }
            Claim::Busy(state) => return self.wait_for_leader(fingerprint, state, cancel).await,
            Claim::Owner(guard) => guard,
            Claim::Disposed => return GuidanceOutcome::Failed(GuidanceError::Disposed),
        };

        debug!(%fingerprint, "fetching guidance");
        let result = tokio::select! {
            _ = cancel.cancelled() => Err(GuidanceError::Cancelled),
            _ = self.inner.cancel.cancelled() => Err(GuidanceError::Cancelled),
            r = run_with_timeout(self.inner.config.fetch_timeout, fetch()) => r,
        };

        match result {
            Ok(payload) => {
                let parsed: GuidanceParseResult = payload.into();
                let valid = parsed.is_valid();
                let record = parsed.into_record();

                // Records with nothing to show are not cached so a rescan can retry.
                guard.complete(record.is_usable().then(|| record.clone()));

                if valid {
                    GuidanceOutcome::Fetched(record)
                } else {
                    warn!(%fingerprint, "malformed guidance payload, using best-effort record");
                    GuidanceOutcome::Degraded(record)
                }
            }
            Err(err) => {
                warn!(%fingerprint, error = %err, "guidance fetch failed");
                drop(guard);
                GuidanceOutcome::Failed(err)
            }
        }
    }

    fn claim(&self, fingerprint: &FieldFingerprint) -> Claim {
        let mut state = self.inner.state.lock();

        if state.disposed {
            return Claim::Disposed;
        }
        if let Some(record) = state.cache.get(fingerprint) {
            return Claim::Hit(record);
        }
        if let Some(entry) = state.in_flight.get(fingerprint) {
            return Claim::Busy(entry.state.clone());
        }

        let ticket = state.next_ticket;
        state.next_ticket += 1;
        let (tx, rx) = watch::channel(FetchState::Pending);
        state
            .in_flight
            .insert(fingerprint.clone(), InFlightEntry { ticket, state: rx });

        Claim::Owner(InFlightGuard {
            inner: self.inner.clone(),
            fingerprint: fingerprint.clone(),
            ticket,
            tx: Some(tx),
        })
    }

    async fn wait_for_leader(
        &self,
        fingerprint: &FieldFingerprint,
        mut state: watch::Receiver<FetchState>,
        cancel: CancellationToken,
    ) -> GuidanceOutcome {
        if self.inner.config.in_flight == InFlightPolicy::Skip {
            debug!(%fingerprint, "guidance already in flight, skipping");
            return GuidanceOutcome::InFlight;
        }

        let settled = tokio::select! {
            _ = cancel.cancelled() => return GuidanceOutcome::Failed(GuidanceError::Cancelled),
            r = state.wait_for(|s| matches!(s, FetchState::Done(_))) => r.map(|s| s.clone()),
        };

        match settled {
            Ok(FetchState::Done(Some(record))) => GuidanceOutcome::Joined(record),
            _ => GuidanceOutcome::Failed(GuidanceError::JoinedFetchFailed(fingerprint.to_string())),
        }
    }

    /// Cancel outstanding fetches and drop all state. Later requests fail
    /// with `GuidanceError::Disposed`.
    pub fn dispose(&self) {
        self.inner.cancel.cancel();
        let mut state = self.inner.state.lock();
        state.disposed = true;
        state.cache.clear();
        state.in_flight.clear();
        debug!("guidance session disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.state.lock().disposed
    }

    pub fn cached(&self, fingerprint: &FieldFingerprint) -> Option<GuidanceRecord> {
        self.inner.state.lock().cache.get(fingerprint)
    }

    pub fn is_cached(&self, fingerprint: &FieldFingerprint) -> bool {
        self.cached(fingerprint).is_some()
    }

    pub fn is_in_flight(&self, fingerprint: &FieldFingerprint) -> bool {
        self.inner.state.lock().in_flight.contains_key(fingerprint)
    }

    pub fn cache_len(&self) -> usize {
        self.inner.state.lock().cache.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.inner.state.lock().in_flight.len()
    }
}

impl Default for GuidanceSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

async fn run_with_timeout<Fut, P>(limit: Option<Duration>, fut: Fut) -> Result<P, GuidanceError>
where
    Fut: Future<Output = Result<P, GuidanceError>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .unwrap_or(Err(GuidanceError::Timeout(limit))),
        None => fut.await,
    }
}

// ============================================================================
// In-flight guard
// ============================================================================

/// Holds a fingerprint in the in-flight set. Dropping it on any path,
/// including a dropped or cancelled future, releases the fingerprint.
struct InFlightGuard {
    inner: Arc<SessionInner>,
    fingerprint: FieldFingerprint,
    ticket: u64,
    tx: Option<watch::Sender<FetchState>>,
}

impl InFlightGuard {
    /// Cache `record` (if any) and release in one critical section.
    fn complete(mut self, record: Option<GuidanceRecord>) {
        {
            let mut state = self.inner.state.lock();
            if let Some(record) = &record {
                if !state.disposed {
                    state.cache.insert(self.fingerprint.clone(), record.clone());
                }
            }
            self.release(&mut state);
        }

        if let Some(tx) = self.tx.take() {
            tx.send_replace(FetchState::Done(record));
        }
    }

    fn release(&self, state: &mut SessionState) {
        if state
            .in_flight
            .get(&self.fingerprint)
            .is_some_and(|e| e.ticket == self.ticket)
        {
            state.in_flight.remove(&self.fingerprint);
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let mut state = self.inner.state.lock();
            self.release(&mut state);
            drop(state);
            tx.send_replace(FetchState::Done(None));
        }
    }
}
