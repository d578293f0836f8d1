use std::time::Duration;

use serde::Deserialize;

// ─── Defaults ────────────────────────────────────────────────────

const DEFAULT_HOST: &str = "https://api.airbrake.io";

/// How long a window accumulates before it is detached and sent.
const DEFAULT_FLUSH_PERIOD_SECS: u64 = 15;

/// Centroid budget handed to every per-bucket tdigest.
const DEFAULT_TDIGEST_COMPRESSION: usize = 20;

// ─── Options ─────────────────────────────────────────────────────

/// Collector connection and aggregation settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Options {
    pub project_id: u64,
    pub project_key: String,

    /// Collector base URL, without the `/api/...` suffix
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_flush_period_secs")]
    pub flush_period_secs: u64,

    #[serde(default = "default_tdigest_compression")]
    pub tdigest_compression: usize,
}

fn default_host() -> String {
    DEFAULT_HOST.into()
}
fn default_flush_period_secs() -> u64 {
    DEFAULT_FLUSH_PERIOD_SECS
}
fn default_tdigest_compression() -> usize {
    DEFAULT_TDIGEST_COMPRESSION
}

impl Options {
    pub fn new(project_id: u64, project_key: impl Into<String>) -> Self {
        Self {
            project_id,
            project_key: project_key.into(),
            host: default_host(),
            flush_period_secs: DEFAULT_FLUSH_PERIOD_SECS,
            tdigest_compression: DEFAULT_TDIGEST_COMPRESSION,
        }
    }

    pub fn flush_period(&self) -> Duration {
        Duration::from_secs(self.flush_period_secs)
    }

    /// `PUT` target for route statistics.
    pub fn routes_stats_url(&self) -> String {
        format!(
            "{}/api/v5/projects/{}/routes-stats",
            self.host.trim_end_matches('/'),
            self.project_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_fills_defaults() {
        let opts: Options =
            serde_json::from_str(r#"{"project_id": 42, "project_key": "secret"}"#)
                .unwrap();

        assert_eq!(opts.host, DEFAULT_HOST);
        assert_eq!(opts.flush_period(), Duration::from_secs(15));
        assert_eq!(opts.tdigest_compression, 20);
    }

    #[test]
    fn url_trims_trailing_slash() {
        let mut opts = Options::new(7, "key");
        opts.host = "http://localhost:8080/".into();

        assert_eq!(
            opts.routes_stats_url(),
            "http://localhost:8080/api/v5/projects/7/routes-stats"
        );
    }
}
