use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

use common::{DEFAULT_LEADERBOARD_LIMIT, MAX_LEADERBOARD_LIMIT};

const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

/// Server settings, read from `SNAKE_ARENA_*` environment variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address the HTTP API binds to
    pub http_addr: String,
    /// Postgres connection string. The in-memory store is used when unset.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    /// Directory with the static web front end, served next to the API
    pub web_dir: Option<String>,
    /// Number of entries returned by `/api/leaderboard` without a `limit`
    pub leaderboard_limit: usize,
    pub bcrypt_cost: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            database_url: None,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            web_dir: None,
            leaderboard_limit: DEFAULT_LEADERBOARD_LIMIT,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let leaderboard_limit = parse_or(&get, "SNAKE_ARENA_LEADERBOARD_LIMIT", defaults.leaderboard_limit)?
            .clamp(1, MAX_LEADERBOARD_LIMIT);

        let bcrypt_cost = parse_or(&get, "SNAKE_ARENA_BCRYPT_COST", defaults.bcrypt_cost)?;
        anyhow::ensure!(
            (4..=31).contains(&bcrypt_cost),
            "SNAKE_ARENA_BCRYPT_COST must be between 4 and 31, got {}",
            bcrypt_cost
        );

        Ok(Self {
            http_addr: get("SNAKE_ARENA_HTTP_ADDR").unwrap_or(defaults.http_addr),
            database_url: get("SNAKE_ARENA_DATABASE_URL"),
            db_max_connections: parse_or(
                &get,
                "SNAKE_ARENA_DB_MAX_CONNECTIONS",
                defaults.db_max_connections,
            )?,
            web_dir: get("SNAKE_ARENA_WEB_DIR"),
            leaderboard_limit,
            bcrypt_cost,
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => value
            .parse::<T>()
            .with_context(|| format!("{} has an invalid value: {:?}", key, value)),
        None => Ok(default),
    }
}
