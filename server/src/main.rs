use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use server::api::run_api_server;
use server::config::ServerConfig;
use server::db::{Database, MemoryDatabase, PostgresDatabase};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if exists
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env().context("Invalid server configuration")?;

    let db: Arc<dyn Database> = match config.database_url.as_deref() {
        Some(url) => {
            let db = PostgresDatabase::connect(url, config.db_max_connections).await?;
            info!("Connected to PostgreSQL");
            Arc::new(db)
        }
        None => {
            warn!("SNAKE_ARENA_DATABASE_URL not set, accounts and scores are kept in memory only");
            Arc::new(MemoryDatabase::new())
        }
    };

    run_api_server(&config, db).await?;

    info!("Server stopped");
    Ok(())
}
