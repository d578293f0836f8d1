use http::StatusCode;
use thiserror::Error;

/// Boxed error returned by an injected [`HttpClient`](crate::transport::HttpClient).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// ─── Sketch ──────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SketchError {
    #[error("invalid tdigest compression: {0} (must be > 0)")]
    InvalidCompression(usize),

    #[error("sketch rejected non-finite value {0}")]
    NonFiniteValue(f64),

    #[error("sketch has uncompressed samples, call compress() first")]
    Uncompressed,

    #[error("sketch encode failed: {0}")]
    Encode(#[source] bincode::Error),

    #[error("sketch decode failed: {0}")]
    Decode(#[source] bincode::Error),
}

// ─── Record path ─────────────────────────────────────────────────

/// Errors surfaced synchronously to the caller of `record_request`.
#[derive(Debug, Error)]
pub enum RouteStatsError {
    #[error(transparent)]
    Sketch(#[from] SketchError),

    #[error("cannot compute bucket time: {0}")]
    Bucket(#[from] chrono::RoundingError),

    #[error("route stats must be created inside a tokio runtime: {0}")]
    Runtime(#[from] tokio::runtime::TryCurrentError),
}

// ─── Flush path ──────────────────────────────────────────────────

/// Errors from serializing and transmitting a sealed window.
/// None of these ever reach a `record_request` caller.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Sketch(#[from] SketchError),

    #[error("routes stats encode failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("project key is not a valid header value: {0}")]
    InvalidProjectKey(#[from] http::header::InvalidHeaderValue),

    #[error("routes stats transport failed: {0}")]
    Transport(#[source] BoxError),

    /// The collector rejected the project key.
    #[error("unauthorized: project key rejected by collector")]
    Unauthorized,

    #[error("got unexpected response status=\"{0}\"")]
    UnexpectedStatus(StatusCode),
}
