use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers;
use crate::middleware::timing;
use crate::AppState;

/// Builds the full Axum `Router` with all routes and the stats middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // ── User endpoints ──────────────────────────────────────
        .route("/api/users/:id", get(handlers::users::get_user))
        .route("/api/users", post(handlers::users::create_user))
        // ── Route stats ─────────────────────────────────────────
        .route("/api/routes", get(handlers::routes::get_routes))
        .route("/api/routes/flush", post(handlers::routes::flush_routes))
        // ── Route-level middleware so `MatchedPath` is populated ─
        .route_layer(axum_mw::from_fn_with_state(
            state.clone(),
            timing::record_route_stats,
        ))
        // ── Provide shared state to all routes above ────────────
        .with_state(state)
}
