use std::sync::Arc;

use chrono::{DateTime, Utc};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Method};
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeropool::BufferPool;

use crate::config::Options;
use crate::error::ReportError;
use crate::transport::{HttpClient, HttpRequest};

use super::sketch::QuantileSketch;
use super::store::Routes;

/// Starting size for a pooled body buffer; grows with the payload.
const BODY_CAPACITY: usize = 16 * 1024;

// ─── Wire format ─────────────────────────────────────────────────

/// `PUT` body: every bucket of one sealed window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutesPayload {
    pub routes: Vec<RouteRecord>,
}

/// One (key, stat) pair as the collector expects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRecord {
    pub method: String,
    pub route: String,
    pub status_code: u16,
    pub time: DateTime<Utc>,
    pub count: u64,
    pub sum: f64,
    pub sumsq: f64,
    #[serde(with = "base64_bytes")]
    pub tdigest: Vec<u8>,
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(d)?;
        STANDARD.decode(encoded).map_err(D::Error::custom)
    }
}

// ─── Reporter ────────────────────────────────────────────────────

/// Serializes sealed windows and ships them to the collector.
pub struct Reporter {
    url: String,
    project_key: String,
    client: Arc<dyn HttpClient>,
    buffers: BufferPool,
}

impl Reporter {
    pub fn new(opts: &Options, client: Arc<dyn HttpClient>) -> Self {
        Self {
            url: opts.routes_stats_url(),
            project_key: opts.project_key.clone(),
            client,
            buffers: BufferPool::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Seal every stat of a detached window and build the wire payload.
    ///
    /// Any sketch failure aborts the whole payload, but every stat is still
    /// sealed. Buckets that never accepted a sample are skipped.
    pub fn build_payload<S: QuantileSketch>(
        routes: &Routes<S>,
    ) -> Result<RoutesPayload, ReportError> {
        let mut records = Vec::with_capacity(routes.len());
        let mut failure = None;

        for (key, stat) in routes {
            let mut stat = stat.lock();
            if let Err(err) = stat.seal() {
                failure.get_or_insert(err);
                continue;
            }
            if failure.is_some() || stat.count() == 0 {
                continue;
            }

            records.push(RouteRecord {
                method: key.method.clone(),
                route: key.route.clone(),
                status_code: key.status_code,
                time: key.time,
                count: stat.count(),
                sum: stat.sum(),
                sumsq: stat.sumsq(),
                tdigest: stat.sketch_bytes().to_vec(),
            });
        }

        if let Some(err) = failure {
            return Err(err.into());
        }

        // Stable order keeps payloads diffable
        records.sort_by(|a, b| {
            (a.time, &a.route, &a.method, a.status_code)
                .cmp(&(b.time, &b.route, &b.method, b.status_code))
        });

        Ok(RoutesPayload { routes: records })
    }

    /// Send one sealed window. No retries: the caller drops the window on error.
    pub async fn send<S: QuantileSketch>(&self, routes: &Routes<S>) -> Result<(), ReportError> {
        let payload = Self::build_payload(routes)?;

        let mut buf = self.buffers.get(BODY_CAPACITY);
        buf.clear();
        let body: &mut Vec<u8> = &mut buf;
        serde_json::to_writer(&mut *body, &payload)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.project_key))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let resp = self
            .client
            .send(HttpRequest {
                method: Method::PUT,
                url: &self.url,
                headers,
                body: body.as_slice(),
            })
            .await
            .map_err(ReportError::Transport)?;

        // Reset before the buffer goes back to the pool
        body.clear();

        if resp.status.is_success() {
            return Ok(());
        }

        debug!(
            status = %resp.status,
            body = %String::from_utf8_lossy(&resp.body),
            "collector refused route stats"
        );

        match resp.status {
            http::StatusCode::UNAUTHORIZED => Err(ReportError::Unauthorized),
            status => Err(ReportError::UnexpectedStatus(status)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::TimeZone;
    use parking_lot::Mutex;

    use super::*;
    use crate::routes::sketch::TDigestSketch;
    use crate::routes::stat::RouteStat;
    use crate::routes::RouteKey;

    fn key(route: &str, minute: u32) -> RouteKey {
        RouteKey {
            method: "GET".into(),
            route: route.into(),
            status_code: 200,
            time: Utc.with_ymd_and_hms(2024, 3, 1, 10, minute, 0).unwrap(),
        }
    }

    fn window(samples: &[(RouteKey, &[f64])]) -> Routes<TDigestSketch> {
        let mut routes = HashMap::new();
        for (key, values) in samples {
            let mut stat = RouteStat::new(20);
            for v in values.iter() {
                stat.add(*v).unwrap();
            }
            routes.insert(key.clone(), Arc::new(Mutex::new(stat)));
        }
        routes
    }

    #[test]
    fn payload_uses_collector_field_names() {
        let routes = window(&[(key("/users", 5), &[10.0, 20.0, 30.0][..])]);
        let payload = Reporter::build_payload(&routes).unwrap();
        let json = serde_json::to_value(&payload).unwrap();

        let record = &json["routes"][0];
        assert_eq!(record["method"], "GET");
        assert_eq!(record["route"], "/users");
        assert_eq!(record["statusCode"], 200);
        assert_eq!(record["time"], "2024-03-01T10:05:00Z");
        assert_eq!(record["count"], 3);
        assert_eq!(record["sum"], 60.0);
        assert_eq!(record["sumsq"], 1400.0);
        assert!(record["tdigest"].is_string());
    }

    #[test]
    fn payload_round_trips() {
        let routes = window(&[
            (key("/users", 5), &[10.0, 20.0, 30.0][..]),
            (key("/users", 6), &[4.0][..]),
            (key("/orders", 5), &[1.5, 2.5][..]),
        ]);
        let payload = Reporter::build_payload(&routes).unwrap();
        let encoded = serde_json::to_vec(&payload).unwrap();
        let decoded: RoutesPayload = serde_json::from_slice(&encoded).unwrap();

        assert_eq!(decoded.routes, payload.routes);
        assert_eq!(decoded.routes.len(), 3);

        let users = decoded
            .routes
            .iter()
            .find(|r| r.route == "/users" && r.time == key("/users", 5).time)
            .unwrap();
        let sketch = TDigestSketch::from_bytes(&users.tdigest).unwrap();
        let p50 = sketch.quantile(0.5).unwrap();
        assert!((10.0..=30.0).contains(&p50));
    }

    #[test]
    fn empty_stats_are_skipped() {
        let mut routes = window(&[(key("/users", 5), &[1.0][..])]);
        routes.insert(key("/broken", 5), Arc::new(Mutex::new(RouteStat::new(0))));

        let payload = Reporter::build_payload(&routes).unwrap();
        assert_eq!(payload.routes.len(), 1);
        assert_eq!(payload.routes[0].route, "/users");
        assert!(routes.values().all(|stat| stat.lock().is_sealed()));
    }
}
