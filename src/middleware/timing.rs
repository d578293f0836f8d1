use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use route_stats::RequestInfo;
use std::sync::Arc;

use crate::AppState;

/// Route-level middleware that reports every request to the stats store:
/// method, matched route template, status and wall-clock start/end.
///
/// Also adds a `Server-Timing` header with the handler time.
/// Requests that matched no route are not recorded, so unmatched paths
/// cannot blow up bucket cardinality.
pub async fn record_route_stats(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().as_str().to_owned();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned());

    let start = Utc::now();
    let mut response = next.run(req).await;
    let end = Utc::now();

    let Some(route) = route else {
        return response;
    };

    let info = RequestInfo::new(method, route, response.status().as_u16(), start, end);

    // ── Inject response header ──────────────────────────────────
    let server_timing = format!("total;dur={:.3}", info.elapsed_ms());
    if let Ok(val) = server_timing.parse() {
        response.headers_mut().insert("Server-Timing", val);
    }

    if let Err(err) = state.stats.record_request(&info) {
        tracing::warn!(%err, route = %info.route, "failed to record route stats");
    }

    response
}
