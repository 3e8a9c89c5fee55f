//! Taskgate API server binary.
//!
//! Reads settings from the environment (and `.env`), picks a store, and
//! serves the API until Ctrl-C.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use taskgate_api::{AppState, config::ApiConfig};
use taskgate_core::auth::SlidingWindowLimiter;
use taskgate_core::store::{MemoryStore, PgStore, Store};
use tracing::{debug, info, warn};

const DEFAULT_LOG_FILTER: &str = "info,taskgate_api=debug,taskgate_core=debug";

/// CLI arguments for the API server. Flags override the environment.
#[derive(Parser, Debug)]
#[command(name = "taskgate_api_server", about = "Taskgate API server")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR")]
    bind_addr: Option<String>,

    /// PostgreSQL connection URL. Without one, data is kept in memory.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Seconds between sweeps that drop idle rate-limit windows.
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    purge_interval_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env()?;
    if let Some(bind_addr) = args.bind_addr {
        config.bind_addr = bind_addr;
    }
    if let Some(database_url) = args.database_url.filter(|u| !u.trim().is_empty()) {
        config.database_url = Some(database_url);
    }
    info!(bind_addr = %config.bind_addr, auth = ?config.auth, "starting taskgate_api_server");

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            info!(max_connections = args.max_connections, "configuring connection pool");
            let pool = PgPoolOptions::new()
                .max_connections(args.max_connections)
                .acquire_timeout(Duration::from_secs(30))
                .connect(url)
                .await?;

            info!("running database migrations");
            taskgate_core::migrate::migrate(&pool).await?;
            Arc::new(PgStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set, using the in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let limiter = Arc::new(SlidingWindowLimiter::new(config.auth.rate_limit));
    let public_limiter = Arc::new(SlidingWindowLimiter::new(config.auth.public_rate_limit));
    spawn_limiter_housekeeping(
        [limiter.clone(), public_limiter.clone()],
        Duration::from_secs(args.purge_interval_secs),
    );

    let state = AppState::with_limiters(config.clone(), store, limiter, public_limiter);
    let app = taskgate_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("server stopped");
    Ok(())
}

/// Periodically drop keys whose windows have emptied.
fn spawn_limiter_housekeeping<const N: usize>(
    limiters: [Arc<SlidingWindowLimiter>; N],
    every: Duration,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            for limiter in &limiters {
                let purged = limiter.purge_idle();
                if purged > 0 {
                    debug!(purged, remaining = limiter.tracked_keys(), "dropped idle rate-limit windows");
                }
            }
        }
    });
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            warn!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    }
}
