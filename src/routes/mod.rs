pub mod percentiles;
pub mod reporter;
pub mod sketch;
pub mod stat;
pub mod store;

use chrono::{DateTime, DurationRound, TimeDelta, TimeZone, Utc};

use crate::error::RouteStatsError;

pub use percentiles::PercentileSet;
pub use reporter::{Reporter, RouteRecord, RoutesPayload};
pub use sketch::{QuantileSketch, TDigestSketch};
pub use stat::RouteStat;
pub use store::{RouteSnapshot, RouteStats};

/// Bucket granularity: samples are grouped per calendar minute (UTC).
pub fn bucket_granularity() -> TimeDelta {
    TimeDelta::minutes(1)
}

/// One completed HTTP request, as reported by the instrumentation layer.
/// This is the "write" side; callers build one per request and hand it in.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub method: String,
    /// Matched route template, e.g. "/api/users/:id", never the raw path
    pub route: String,
    pub status_code: u16,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl RequestInfo {
    /// Timestamps in any timezone are normalized to UTC.
    pub fn new<Tz: TimeZone>(
        method: impl Into<String>,
        route: impl Into<String>,
        status_code: u16,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
    ) -> Self {
        Self {
            method: method.into(),
            route: route.into(),
            status_code,
            start: start.with_timezone(&Utc),
            end: end.with_timezone(&Utc),
        }
    }

    /// Elapsed wall time in fractional milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        let elapsed = self.end - self.start;
        match elapsed.num_nanoseconds() {
            Some(ns) => ns as f64 / 1_000_000.0,
            None => elapsed.num_milliseconds() as f64,
        }
    }
}

/// Aggregation dimensions. Two requests share a [`RouteStat`] only if all
/// four fields are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub method: String,
    pub route: String,
    pub status_code: u16,
    /// Bucket start, truncated to [`bucket_granularity`]
    pub time: DateTime<Utc>,
}

impl RouteKey {
    pub fn from_request(info: &RequestInfo) -> Result<Self, RouteStatsError> {
        Ok(Self {
            method: info.method.clone(),
            route: info.route.clone(),
            status_code: info.status_code,
            time: info.start.duration_trunc(bucket_granularity())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::FixedOffset;

    use super::*;

    fn at(rfc3339: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap()
    }

    #[test]
    fn key_truncates_to_minute_in_utc() {
        let local = RequestInfo::new(
            "GET",
            "/users",
            200,
            at("2024-03-01T15:42:17.250+05:00"),
            at("2024-03-01T15:42:17.260+05:00"),
        );
        let utc = RequestInfo::new(
            "GET",
            "/users",
            200,
            at("2024-03-01T10:42:59.999Z"),
            at("2024-03-01T10:43:00.100Z"),
        );

        let a = RouteKey::from_request(&local).unwrap();
        let b = RouteKey::from_request(&utc).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.time.to_rfc3339(), "2024-03-01T10:42:00+00:00");
    }

    #[test]
    fn different_minutes_are_different_keys() {
        let first = RequestInfo::new(
            "GET",
            "/users",
            200,
            at("2024-03-01T10:42:59Z"),
            at("2024-03-01T10:43:00Z"),
        );
        let second = RequestInfo::new(
            "GET",
            "/users",
            200,
            at("2024-03-01T10:43:00Z"),
            at("2024-03-01T10:43:01Z"),
        );

        assert_ne!(
            RouteKey::from_request(&first).unwrap(),
            RouteKey::from_request(&second).unwrap()
        );
    }

    #[test]
    fn elapsed_is_fractional_milliseconds() {
        let info = RequestInfo::new(
            "POST",
            "/users",
            201,
            at("2024-03-01T10:00:00.000000Z"),
            at("2024-03-01T10:00:00.012500Z"),
        );
        assert!((info.elapsed_ms() - 12.5).abs() < 1e-9);
    }
}
