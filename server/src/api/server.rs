use anyhow::Result;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::info;

use crate::config::ServerConfig;
use crate::db::Database;

use super::{auth, leaderboard, scores};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn Database>,
    /// Default size of `/api/leaderboard`
    pub leaderboard_limit: usize,
    pub bcrypt_cost: u32,
}

impl AppState {
    pub fn new(db: Arc<dyn Database>, config: &ServerConfig) -> Self {
        Self {
            db,
            leaderboard_limit: config.leaderboard_limit,
            bcrypt_cost: config.bcrypt_cost,
        }
    }
}

pub fn build_router(state: AppState, web_dir: Option<&str>) -> Router {
    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        .route("/api/health", get(health_check))
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::login))
        .route("/api/change-name", post(auth::change_name))
        .route("/api/change-avatar", post(auth::change_avatar))
        .route("/api/score", post(scores::submit_score))
        .route("/api/leaderboard", get(leaderboard::get_leaderboard))
        .route("/api/users", get(leaderboard::list_users))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Add static file serving if web_dir is provided
    if let Some(dir) = web_dir {
        let index_path = format!("{}/index.html", dir);
        let serve_dir = ServeDir::new(dir).not_found_service(ServeFile::new(&index_path));
        app = app.fallback_service(serve_dir);

        info!("Serving static files from: {}", dir);
    }

    app
}

pub async fn run_api_server(config: &ServerConfig, db: Arc<dyn Database>) -> Result<()> {
    let state = AppState::new(db, config);
    let app = build_router(state, config.web_dir.as_deref());

    let listener = TcpListener::bind(&config.http_addr).await?;
    info!("API server listening on {}", config.http_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("API server error: {}", e))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, stopping API server");
}

async fn health_check() -> &'static str {
    "OK"
}
