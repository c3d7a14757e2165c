//! mfd-daemon entry point.
//!
//! Sets up tracing, loads configuration, connects and migrates Postgres,
//! wires middleware, and starts the HTTP server. All route handlers live in
//! `routes.rs`; all shared state types live in `state.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use mfd_config::{report_unused_keys, resolve_secrets, UnusedKeyPolicy};
use mfd_daemon::{routes, state};
use mfd_db::PgStore;
use tower_http::{
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

const DEFAULT_CONFIG: &str = "config/defaults/frontdesk.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env.local if present (dev convenience).
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let loaded = mfd_config::load_from_env(&[DEFAULT_CONFIG])?;
    let unused = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    for key in &unused.unused_leaf_pointers {
        warn!(key = %key, "config key is not consumed by mfd-daemon");
    }
    let cfg = loaded.frontdesk()?;
    cfg.validate()?;
    info!(config_hash = %loaded.config_hash, "config loaded");

    let secrets = resolve_secrets(&cfg);
    let pool = mfd_db::connect(secrets.require_database_url()?, cfg.db.max_connections).await?;
    mfd_db::migrate(&pool).await?;

    let shared = Arc::new(state::AppState::new(
        Arc::new(PgStore::new(pool)),
        cfg.settlement_policy()?,
    ));

    state::spawn_heartbeat(shared.bus.clone(), Duration::from_secs(1));

    // Dropping a timed-out request drops its open transaction, which rolls back.
    let app = routes::build_router(Arc::clone(&shared))
        .layer(TimeoutLayer::new(cfg.request_timeout()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors(&cfg.daemon.cors_origins));

    let addr = match bind_addr_from_env() {
        Some(addr) => addr,
        None => cfg.bind_addr()?,
    };
    info!("mfd-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var("MFD_DAEMON_ADDR").ok()?.parse().ok()
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}

/// CORS: only the configured front-desk origins.
fn cors(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}
