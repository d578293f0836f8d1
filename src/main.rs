use std::collections::HashMap;
use std::sync::Arc;

use clap::Parser;
use parking_lot::RwLock;
use route_stats::{Options, ReqwestClient, RouteStats};
use tracing_subscriber::EnvFilter;

mod handlers;
mod load_generator;
mod middleware;
mod server;

/// Demo service instrumented with route statistics.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    #[arg(long, env = "ROUTE_STATS_PROJECT_ID")]
    project_id: u64,

    #[arg(long, env = "ROUTE_STATS_PROJECT_KEY", hide_env_values = true)]
    project_key: String,

    #[arg(long, env = "ROUTE_STATS_HOST", default_value = "https://api.airbrake.io")]
    host: String,

    #[arg(long, env = "ROUTE_STATS_FLUSH_PERIOD_SECS", default_value_t = 15)]
    flush_period_secs: u64,

    #[arg(long, default_value = "0.0.0.0:3000")]
    listen: String,

    /// Synthetic workers feeding samples straight into the store (0 = off)
    #[arg(long, default_value_t = 0)]
    synthetic_workers: u32,
}

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// Aggregation engine: the middleware records, `/api/routes` reads.
    pub stats: RouteStats,

    /// In-memory user table backing the demo endpoints.
    pub users: RwLock<HashMap<String, handlers::users::User>>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // ── 1. Build options ─────────────────────────────────────────
    let mut opts = Options::new(args.project_id, args.project_key);
    opts.host = args.host;
    opts.flush_period_secs = args.flush_period_secs;

    // ── 2. Build shared state ────────────────────────────────────
    let stats = RouteStats::new(&opts, Arc::new(ReqwestClient::default()))?;
    let state = Arc::new(AppState {
        stats: stats.clone(),
        users: RwLock::new(handlers::users::seed()),
    });

    // ── 3. Optional synthetic load ───────────────────────────────
    if args.synthetic_workers > 0 {
        tokio::spawn(load_generator::run(stats.clone(), args.synthetic_workers));
    }

    // ── 4. Build Axum router ─────────────────────────────────────
    let app = server::create_router(state);

    // ── 5. Bind & serve ──────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&args.listen).await?;
    tracing::info!(
        listen = %args.listen,
        collector = %opts.routes_stats_url(),
        "route stats demo listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    // ── 6. Ship whatever the last window holds ───────────────────
    if let Err(err) = stats.flush().await {
        tracing::error!(%err, "final route stats flush failed");
    }

    Ok(())
}
