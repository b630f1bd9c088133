//! printshop-daemon entry point.
//!
//! Thin on purpose: tracing, config + secrets, shared state, middleware, serve.
//! Route handlers live in `routes.rs`; shared state types in `state.rs`.

use std::sync::Arc;

use anyhow::Context;
use printshop_daemon::{routes, state::AppState};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, warn, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Dev convenience; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let loaded = printshop_config::load_from_env().context("config load failed")?;
    let mut cfg = loaded.config;
    cfg.apply_env_overrides(|k| std::env::var(k).ok())?;
    for key in &loaded.unused_keys {
        warn!(key = %key, "config key is not used by the daemon");
    }

    let secrets = printshop_config::resolve_secrets(&cfg)?;
    let shared = Arc::new(AppState::from_config(&cfg, &secrets)?);

    let app = routes::build_router(Arc::clone(&shared)).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    let listener = tokio::net::TcpListener::bind(&cfg.daemon.bind_addr)
        .await
        .with_context(|| format!("bind failed: {}", cfg.daemon.bind_addr))?;
    info!(
        config_hash = %loaded.config_hash,
        store_backend = shared.desk.store_backend(),
        "printshop-daemon listening on http://{}",
        cfg.daemon.bind_addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    info!("printshop-daemon stopped");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "ctrl-c handler unavailable; running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
