use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::Options;
use crate::error::{ReportError, RouteStatsError};
use crate::transport::HttpClient;

use super::percentiles::PercentileSet;
use super::reporter::Reporter;
use super::sketch::{QuantileSketch, TDigestSketch};
use super::stat::RouteStat;
use super::{RequestInfo, RouteKey};

/// Bucket map of one aggregation window. Every stat carries its own lock.
pub type Routes<S> = HashMap<RouteKey, Arc<Mutex<RouteStat<S>>>>;

// ─── Public types ────────────────────────────────────────────────

/// Concurrent route statistics store.
///
/// Request handlers call [`record_request`](Self::record_request); a timer
/// task detaches the live window every flush period and hands it to the
/// [`Reporter`]. Cloning is cheap and every clone shares the same window.
pub struct RouteStats<S = TDigestSketch> {
    shared: Arc<Shared<S>>,
}

/// Read-only view of one live bucket.
#[derive(Debug, Clone, Serialize)]
pub struct RouteSnapshot {
    pub method: String,
    pub route: String,
    pub status_code: u16,
    pub time: DateTime<Utc>,
    pub count: u64,
    pub sum: f64,
    pub sumsq: f64,
    pub mean: f64,
    pub stddev: f64,
    pub percentiles: PercentileSet,
}

// ─── Internal state ──────────────────────────────────────────────

struct Shared<S> {
    reporter: Reporter,
    flush_period: Duration,
    compression: usize,
    runtime: Handle,
    state: Mutex<State<S>>,
}

struct State<S> {
    /// Window and timer are created and dropped together.
    window: Option<Window<S>>,
    next_id: u64,
}

struct Window<S> {
    id: u64,
    routes: Routes<S>,
    timer: JoinHandle<()>,
}

impl<S> Clone for RouteStats<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

// ─── RouteStats impl ─────────────────────────────────────────────

impl RouteStats {
    /// Store backed by [`TDigestSketch`]. Must be called inside a tokio runtime.
    pub fn new(opts: &Options, client: Arc<dyn HttpClient>) -> Result<Self, RouteStatsError> {
        Self::with_sketch(opts, client)
    }
}

impl<S: QuantileSketch> RouteStats<S> {
    pub fn with_sketch(
        opts: &Options,
        client: Arc<dyn HttpClient>,
    ) -> Result<Self, RouteStatsError> {
        let runtime = Handle::try_current()?;

        Ok(Self {
            shared: Arc::new(Shared {
                reporter: Reporter::new(opts, client),
                flush_period: opts.flush_period(),
                compression: opts.tdigest_compression,
                runtime,
                state: Mutex::new(State {
                    window: None,
                    next_id: 0,
                }),
            }),
        })
    }

    /// Record one completed request. Never blocks on network I/O.
    ///
    /// The store lock covers only the bucket lookup; the sample itself is
    /// added under the bucket's own lock.
    pub fn record_request(&self, info: &RequestInfo) -> Result<(), RouteStatsError> {
        let key = RouteKey::from_request(info)?;
        let stat = self.resolve(&key);
        self.add_to(&key, stat, info.elapsed_ms())
    }

    /// Bucket for `key` in the live window, creating both as needed.
    fn resolve(&self, key: &RouteKey) -> Arc<Mutex<RouteStat<S>>> {
        let mut state = self.shared.state.lock();
        let window = self.ensure_window(&mut state);
        let compression = self.shared.compression;
        Arc::clone(
            window
                .routes
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(RouteStat::new(compression)))),
        )
    }

    /// Add a sample to `stat`. A stat sealed by a flush that detached its
    /// window in the meantime is replaced by the bucket in the live window.
    fn add_to(
        &self,
        key: &RouteKey,
        mut stat: Arc<Mutex<RouteStat<S>>>,
        ms: f64,
    ) -> Result<(), RouteStatsError> {
        loop {
            let mut guard = stat.lock();
            if !guard.is_sealed() {
                guard.add(ms)?;
                return Ok(());
            }
            drop(guard);
            stat = self.resolve(key);
        }
    }

    /// Detach the live window now and report it, cancelling its timer.
    /// Meant for shutdown; a no-op when nothing has been recorded.
    pub async fn flush(&self) -> Result<(), ReportError> {
        let Some(window) = self.detach(None) else {
            return Ok(());
        };
        window.timer.abort();
        self.report(window).await
    }

    /// Whether a window (and therefore a pending flush) currently exists.
    pub fn has_live_window(&self) -> bool {
        self.shared.state.lock().window.is_some()
    }

    /// Per-bucket view of the live window, ordered by time then route.
    pub fn snapshot(&self) -> Vec<RouteSnapshot> {
        let entries: Vec<_> = {
            let state = self.shared.state.lock();
            match &state.window {
                Some(window) => window
                    .routes
                    .iter()
                    .map(|(key, stat)| (key.clone(), Arc::clone(stat)))
                    .collect(),
                None => Vec::new(),
            }
        };

        let mut snapshot: Vec<RouteSnapshot> = entries
            .into_iter()
            .map(|(key, stat)| {
                let stat = stat.lock();
                RouteSnapshot {
                    method: key.method,
                    route: key.route,
                    status_code: key.status_code,
                    time: key.time,
                    count: stat.count(),
                    sum: stat.sum(),
                    sumsq: stat.sumsq(),
                    mean: stat.mean(),
                    stddev: stat.stddev(),
                    percentiles: stat
                        .sketch()
                        .map(PercentileSet::from_sketch)
                        .unwrap_or_else(PercentileSet::empty),
                }
            })
            .collect();

        snapshot.sort_by(|a, b| {
            (a.time, &a.route, &a.method, a.status_code)
                .cmp(&(b.time, &b.route, &b.method, b.status_code))
        });
        snapshot
    }

    // ── Window lifecycle ────────────────────────────────────────

    /// Return the live window, creating it and arming its timer if absent.
    /// Runs under the store lock, so concurrent first callers see one window.
    fn ensure_window<'a>(&self, state: &'a mut State<S>) -> &'a mut Window<S> {
        let State { window, next_id } = state;
        window.get_or_insert_with(|| {
            let id = *next_id;
            *next_id += 1;
            debug!(window = id, period = ?self.shared.flush_period, "armed route stats window");
            Window {
                id,
                routes: HashMap::new(),
                timer: self.arm_timer(id),
            }
        })
    }

    /// Single-shot timer. It is not rearmed: the next window is armed by
    /// the first request after the flush.
    fn arm_timer(&self, id: u64) -> JoinHandle<()> {
        let stats = self.clone();
        let period = self.shared.flush_period;
        self.shared.runtime.spawn(async move {
            tokio::time::sleep(period).await;
            stats.flush_window(id).await;
        })
    }

    async fn flush_window(&self, id: u64) {
        let Some(window) = self.detach(Some(id)) else {
            return;
        };
        // Flush-or-drop: the window is gone whatever the outcome
        let _ = self.report(window).await;
    }

    /// Swap the live window out under the store lock. With `Some(id)`, only
    /// that window is taken; a newer window is left alone.
    fn detach(&self, id: Option<u64>) -> Option<Window<S>> {
        let mut state = self.shared.state.lock();
        if let (Some(window), Some(id)) = (&state.window, id) {
            if window.id != id {
                return None;
            }
        }
        state.window.take()
    }

    async fn report(&self, window: Window<S>) -> Result<(), ReportError> {
        let routes = window.routes.len();
        let result = self.shared.reporter.send(&window.routes).await;

        match &result {
            Ok(()) => info!(window = window.id, routes, "route stats sent"),
            Err(ReportError::Unauthorized) => warn!(
                window = window.id,
                url = self.shared.reporter.url(),
                "route stats rejected: unauthorized project key"
            ),
            Err(err) => error!(window = window.id, routes, %err, "route stats send failed"),
        }
        result
    }
}
