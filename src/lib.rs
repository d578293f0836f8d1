//! In-process HTTP route latency statistics.
//!
//! Instrumented services call [`RouteStats::record_request`] once per
//! completed request. Samples are grouped into one-minute buckets keyed by
//! method, route template and status code; each bucket keeps count, sum,
//! sum of squares and a tdigest. Every flush period the live window is
//! swapped out and `PUT` to the collector as JSON, off the request path.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use chrono::Utc;
//! use route_stats::{Options, ReqwestClient, RequestInfo, RouteStats};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let stats = RouteStats::new(&Options::new(1, "project-key"), Arc::new(ReqwestClient::default()))?;
//!
//! let start = Utc::now();
//! // ... handle the request ...
//! stats.record_request(&RequestInfo::new("GET", "/api/users/:id", 200, start, Utc::now()))?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod routes;
pub mod transport;

pub use config::Options;
pub use error::{BoxError, ReportError, RouteStatsError, SketchError};
pub use routes::{
    PercentileSet, QuantileSketch, RequestInfo, RouteKey, RouteRecord, RouteSnapshot,
    RouteStat, RouteStats, RoutesPayload, TDigestSketch,
};
pub use transport::{HttpClient, HttpRequest, HttpResponse, ReqwestClient};
