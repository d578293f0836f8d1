use serde::Serialize;

use super::sketch::QuantileSketch;

/// Quantile breakdown for one route bucket, in milliseconds.
/// Serialized straight into the local `/api/routes` snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PercentileSet {
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

impl PercentileSet {
    /// Read estimates out of a sketch.
    /// Returns zeroed values if the sketch is empty.
    pub fn from_sketch<S: QuantileSketch>(sketch: &S) -> Self {
        let q = |q| sketch.quantile(q).unwrap_or(0.0);
        Self {
            p50: q(0.50),
            p90: q(0.90),
            p95: q(0.95),
            p99: q(0.99),
        }
    }

    /// All-zero placeholder for a bucket without a sketch yet.
    pub fn empty() -> Self {
        Self {
            p50: 0.0,
            p90: 0.0,
            p95: 0.0,
            p99: 0.0,
        }
    }
}
