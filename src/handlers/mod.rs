pub mod routes;
pub mod users;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use route_stats::ReportError;

// ─── Unified error type ──────────────────────────────────────────

#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Report(ReportError),
}

impl From<ReportError> for AppError {
    fn from(err: ReportError) -> Self {
        Self::Report(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Report(ReportError::Unauthorized) => (
                StatusCode::BAD_GATEWAY,
                "collector rejected the project key".into(),
            ),
            Self::Report(err) => (StatusCode::BAD_GATEWAY, err.to_string()),
        };

        let body = serde_json::json!({
            "error":  message,
            "status": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}
