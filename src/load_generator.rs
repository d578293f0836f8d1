use chrono::{TimeDelta, Utc};
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use route_stats::{RequestInfo, RouteStats};
use std::time::Duration;

// ─── Synthetic traffic mix ───────────────────────────────────────

/// (method, route template, typical latency in ms)
const ROUTES: &[(&str, &str, f64)] = &[
    ("GET", "/api/users/:id", 3.0),
    ("POST", "/api/users", 12.0),
    ("GET", "/api/products/:id", 5.0),
    ("GET", "/api/sessions/:id", 1.5),
];

/// Pause between synthetic requests per worker.
const PACE: Duration = Duration::from_millis(20);

// ─── Public entry point ──────────────────────────────────────────

/// Spawns `concurrency` Tokio tasks that report fabricated requests
/// straight into `stats` until the process exits.
pub async fn run(stats: RouteStats, concurrency: u32) {
    tracing::info!(concurrency, "synthetic load started");

    let mut handles = Vec::with_capacity(concurrency as usize);
    for worker_id in 0..concurrency {
        let stats = stats.clone();
        handles.push(tokio::spawn(worker(worker_id, stats)));
    }

    for h in handles {
        let _ = h.await;
    }
}

// ─── Worker loop ─────────────────────────────────────────────────

async fn worker(id: u32, stats: RouteStats) {
    // Each worker gets its own deterministic RNG seeded uniquely.
    let mut rng = StdRng::seed_from_u64(1000 + id as u64);

    loop {
        let info = fabricate(&mut rng);
        if let Err(err) = stats.record_request(&info) {
            tracing::warn!(worker = id, %err, "synthetic sample rejected");
        }
        tokio::time::sleep(PACE).await;
    }
}

fn fabricate(rng: &mut StdRng) -> RequestInfo {
    let (method, route, typical_ms) = ROUTES[rng.gen_range(0..ROUTES.len())];

    // ~2 % errors, ~5 % not-found, rest OK
    let status = match rng.gen_range(0u8..100) {
        0..=1 => 500,
        2..=6 => 404,
        _ if method == "POST" => 201,
        _ => 200,
    };

    // Long-tailed latency: mostly near typical, occasionally 10× slower
    let mut ms = typical_ms * rng.gen_range(0.5..1.5);
    if rng.gen_bool(0.01) {
        ms *= 10.0;
    }

    let end = Utc::now();
    let start = end - TimeDelta::microseconds((ms * 1000.0) as i64);
    RequestInfo::new(method, route, status, start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fabricated_requests_use_known_routes() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let info = fabricate(&mut rng);
            assert!(ROUTES.iter().any(|(m, r, _)| *m == info.method && *r == info.route));
            assert!(info.elapsed_ms() > 0.0);
            assert!([200, 201, 404, 500].contains(&info.status_code));
        }
    }
}
