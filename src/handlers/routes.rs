use axum::{extract::State, Json};
use route_stats::RouteSnapshot;
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;

use super::AppError;

#[derive(Debug, Serialize)]
pub struct FlushStatus {
    pub flushed: bool,
    pub message: String,
}

// ─── GET /api/routes ─────────────────────────────────────────────

/// Live window as JSON, useful for curl / debugging.
pub async fn get_routes(
    State(state): State<Arc<AppState>>,
) -> Json<Vec<RouteSnapshot>> {
    Json(state.stats.snapshot())
}

// ─── POST /api/routes/flush ──────────────────────────────────────

pub async fn flush_routes(
    State(state): State<Arc<AppState>>,
) -> Result<Json<FlushStatus>, AppError> {
    if !state.stats.has_live_window() {
        return Ok(Json(FlushStatus {
            flushed: false,
            message: "No samples recorded since last flush".into(),
        }));
    }

    state.stats.flush().await?;

    Ok(Json(FlushStatus {
        flushed: true,
        message: "Window sent to collector".into(),
    }))
}
