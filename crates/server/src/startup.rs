use std::{sync::Arc, time::Duration};

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tower_http::cors::CorsLayer;
use tracing::info;

use common::posts::PostsApi;
use configs::AppConfig;
use migration::{Migrator, MigratorTrait};
use service::posts::{repo::seaorm::SeaOrmPostRepository, PostSyncService};

use crate::errors::StartupError;
use crate::routes;
use crate::state::ServerState;

/// Single-origin CORS with credentials; wildcards are not allowed together with credentials.
pub fn build_cors(origin: &str) -> Result<CorsLayer, StartupError> {
    let origin = HeaderValue::from_str(origin.trim())
        .map_err(|e| StartupError::InvalidConfig(format!("cors_origin {origin:?}: {e}")))?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]))
}

/// Connect the store, bootstrap its schema and wire the sync service.
pub async fn build_state(cfg: &AppConfig) -> anyhow::Result<ServerState> {
    let db = models::db::connect_with_config(&cfg.database).await?;
    Migrator::up(&db, None).await?;
    info!(service = "server", event = "schema_ready", "post store schema ready");

    let remote = PostsApi::new(&cfg.remote.base_url, Duration::from_secs(cfg.remote.timeout_secs))?;
    info!(service = "server", event = "remote_client", base_url = %remote.base_url(), "remote posts client ready");

    let repo = Arc::new(SeaOrmPostRepository::new(db));
    let posts = Arc::new(PostSyncService::new(repo, Arc::new(remote)));
    Ok(ServerState::new(posts, cfg.server.mode))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!(service = "server", event = "shutdown_signal", "received Ctrl+C, shutting down");
}

/// Public entry: build the app and serve it until Ctrl+C.
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    common::env::ensure_env(&cfg.server.static_dir, cfg.database.sqlite_dir().as_deref()).await?;

    let state = build_state(&cfg).await?;
    let cors = build_cors(&cfg.server.cors_origin)?;
    let app: Router = routes::build_router(state, cors, &cfg.server.static_dir);

    let addr = cfg.server.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        service = "server",
        event = "listening",
        %addr,
        mode = ?cfg.server.mode,
        static_dir = %cfg.server.static_dir,
        "posts cache listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
