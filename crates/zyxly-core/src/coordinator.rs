// ── Poll coordinator ──
//
// Owns the single authoritative telemetry snapshot for one router and
// refreshes it on a fixed interval. Refreshes are serialized through the
// session mutex, bounded by a timeout, and never clobber the previous
// snapshot when they fail. Entities read from the shared `SnapshotCache`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use zyxly_api::{RouterAdapter, Snapshot};

use crate::error::CoreError;

/// Time between scheduled refreshes.
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(30);

/// Upper bound on a single refresh, login included.
pub const REFRESH_TIMEOUT: Duration = Duration::from_secs(15);

/// DAL object fetched when the status payload carries no device section.
const DEVICE_INFO_OID: &str = "status";

// ── SessionState ─────────────────────────────────────────────────

/// Whether the coordinator believes the router session is usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No login attempted yet.
    #[default]
    Unknown,
    Valid,
    /// Last refresh failed or the router stopped returning data.
    Invalid,
}

// ── SnapshotCache ────────────────────────────────────────────────

/// Last good snapshot plus the outcome of the most recent refresh.
///
/// Swapping in a new snapshot is a single pointer store: readers see
/// either the old map or the new one, never a mix.
pub struct SnapshotCache {
    data: ArcSwapOption<Snapshot>,
    last_update_success: AtomicBool,
    last_updated: ArcSwapOption<DateTime<Utc>>,
    last_error: ArcSwapOption<String>,
    version: watch::Sender<u64>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            data: ArcSwapOption::empty(),
            last_update_success: AtomicBool::new(false),
            last_updated: ArcSwapOption::empty(),
            last_error: ArcSwapOption::empty(),
            version,
        }
    }

    /// Replace the snapshot after a successful refresh.
    pub fn commit(&self, snapshot: Snapshot) {
        self.data.store(Some(Arc::new(snapshot)));
        self.last_updated.store(Some(Arc::new(Utc::now())));
        self.last_error.store(None);
        self.last_update_success.store(true, Ordering::Release);
        self.bump();
    }

    /// Record a failed refresh. The snapshot itself is left alone.
    pub fn mark_failed(&self, error: &CoreError) {
        self.last_error.store(Some(Arc::new(error.to_string())));
        self.last_update_success.store(false, Ordering::Release);
        self.bump();
    }

    pub fn data(&self) -> Option<Arc<Snapshot>> {
        self.data.load_full()
    }

    pub fn last_update_success(&self) -> bool {
        self.last_update_success.load(Ordering::Acquire)
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated.load_full().map(|t| *t)
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.load_full().map(|e| (*e).clone())
    }

    /// Change notifications; the value counts completed refreshes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    fn bump(&self) {
        self.version.send_modify(|v| *v = v.wrapping_add(1));
    }
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new()
    }
}

// ── Coordinator ──────────────────────────────────────────────────

/// Polls one router and publishes its telemetry.
///
/// Cheaply cloneable via `Arc`. Clones share the cache, the session
/// state, and the refresh lock.
pub struct Coordinator<R: RouterAdapter> {
    inner: Arc<CoordinatorInner<R>>,
}

struct CoordinatorInner<R> {
    name: String,
    router: Arc<R>,
    cache: Arc<SnapshotCache>,
    /// Held for the whole refresh, so at most one is in flight.
    session: Mutex<SessionState>,
    interval: Duration,
    timeout: Duration,
}

impl<R: RouterAdapter> Clone for Coordinator<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: RouterAdapter> Coordinator<R> {
    pub fn new(name: impl Into<String>, router: Arc<R>) -> Self {
        Self::with_timing(name, router, DEFAULT_SCAN_INTERVAL, REFRESH_TIMEOUT)
    }

    pub fn with_timing(
        name: impl Into<String>,
        router: Arc<R>,
        interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                name: name.into(),
                router,
                cache: Arc::new(SnapshotCache::new()),
                session: Mutex::new(SessionState::Unknown),
                interval,
                timeout,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn router(&self) -> &Arc<R> {
        &self.inner.router
    }

    pub fn cache(&self) -> &Arc<SnapshotCache> {
        &self.inner.cache
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    pub async fn session_state(&self) -> SessionState {
        *self.inner.session.lock().await
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.cache.subscribe()
    }

    /// Run one refresh cycle now.
    ///
    /// Waits for any refresh already in flight. On failure the previous
    /// snapshot stays cached, the failure is recorded, and the session is
    /// marked invalid so the next cycle logs in again.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        let mut session = self.inner.session.lock().await;

        let outcome = tokio::time::timeout(self.inner.timeout, self.fetch(&mut session)).await;

        let err = match outcome {
            Ok(Ok(snapshot)) => {
                debug!(coordinator = %self.inner.name, keys = snapshot.len(), "refresh ok");
                self.inner.cache.commit(snapshot);
                return Ok(());
            }
            Ok(Err(CoreError::UpdateFailed { message })) => {
                CoreError::update_failed(format!("Error communicating with router: {message}"))
            }
            Ok(Err(e)) => CoreError::update_failed(format!("Error communicating with router: {e}")),
            Err(_) => CoreError::update_failed("Router data fetch timed out"),
        };

        *session = SessionState::Invalid;
        self.inner.cache.mark_failed(&err);
        Err(err)
    }

    /// Initial refresh during setup. A failure here means the entry is not
    /// ready and should be retried later.
    pub async fn first_refresh(&self) -> Result<(), CoreError> {
        self.refresh().await.map_err(|e| CoreError::NotReady {
            reason: e.to_string(),
        })
    }

    /// Start the background poll loop. Stops when `cancel` fires.
    pub fn spawn(&self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(poll_task(self.clone(), cancel))
    }

    async fn fetch(&self, session: &mut SessionState) -> Result<Snapshot, CoreError> {
        let router = &self.inner.router;

        if *session != SessionState::Valid {
            if !router.login().await? {
                return Err(CoreError::update_failed("Login failed during data update"));
            }
            *session = SessionState::Valid;
        }

        let mut data = match router.get_status().await {
            Ok(data) => data.filter(|d| !d.is_empty()),
            Err(e) if e.is_auth_expired() => None,
            Err(e) => return Err(e.into()),
        };

        if data.is_none() {
            debug!(coordinator = %self.inner.name, "empty status, logging in again");
            *session = SessionState::Invalid;
            if !router.login().await? {
                return Err(CoreError::update_failed(
                    "Login failed after session timeout",
                ));
            }
            *session = SessionState::Valid;
            data = router.get_status().await?.filter(|d| !d.is_empty());
        }

        let Some(mut data) = data else {
            return Err(CoreError::update_failed("No data received from router"));
        };

        if !data.get("device").is_some_and(is_truthy) {
            match router.get_json_object(DEVICE_INFO_OID).await {
                Ok(Some(info)) if !info.is_empty() => {
                    data.insert("device_info".into(), Value::Object(info));
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(coordinator = %self.inner.name, error = %e, "device info fetch failed");
                }
            }
        }

        Ok(data)
    }
}

/// Mirrors JSON "presence" as the router firmware uses it: null, false,
/// zero, and empty containers count as absent.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

// ── Background task ──────────────────────────────────────────────

async fn poll_task<R: RouterAdapter>(coordinator: Coordinator<R>, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(coordinator.interval());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    info!(coordinator = %coordinator.name(), every = ?coordinator.interval(), "polling started");

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = coordinator.refresh().await {
                    warn!(coordinator = %coordinator.name(), error = %e, "refresh failed");
                }
            }
        }
    }

    debug!(coordinator = %coordinator.name(), "polling stopped");
}
