mod backend_client;
mod config;
mod db;
mod errors;
mod models;
mod preview;
mod reconcile;
mod routes;
mod state;
mod variants;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::backend_client::BackendClient;
use crate::config::Config;
use crate::db::create_pool;
use crate::preview::registry::SessionRegistry;
use crate::routes::build_router;
use crate::state::AppState;
use crate::variants::store::PgVariantStore;

const SESSION_SWEEP_PERIOD: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CV preview API v{}", env!("CARGO_PKG_VERSION"));

    let db = create_pool(&config.database_url).await?;

    let backend = Arc::new(BackendClient::new(
        config.backend_url.clone(),
        config.backend_token.clone(),
    ));
    info!("CV backend client initialized ({})", config.backend_url);

    let orchestrator = config.orchestrator();
    info!(
        "Preview debounce {}ms, manual overrides {}",
        orchestrator.debounce.as_millis(),
        if orchestrator.manual_overrides_enabled { "enabled" } else { "disabled" }
    );

    let sessions = Arc::new(SessionRegistry::new(config.session_idle_timeout()));
    sessions.spawn_reaper(SESSION_SWEEP_PERIOD);
    info!(
        "Idle preview sessions close after {}s",
        config.session_idle_timeout_secs
    );

    let state = AppState {
        orchestrator,
        library: backend.clone(),
        engine: backend,
        variants: Arc::new(PgVariantStore::new(db)),
        sessions,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
