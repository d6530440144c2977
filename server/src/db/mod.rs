pub mod memory;
pub mod models;
pub mod postgres;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use models::*;

pub use memory::MemoryDatabase;
pub use postgres::PostgresDatabase;

/// Store failures callers are expected to handle. Carried inside `anyhow::Error`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DbError {
    #[error("Email already registered: {0}")]
    DuplicateEmail(String),
}

#[async_trait]
pub trait Database: Send + Sync {
    // User operations
    async fn create_user(&self, email: &str, nickname: &str, password_hash: &str) -> Result<User>;
    async fn get_user_by_id(&self, user_id: i32) -> Result<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn update_nickname(&self, user_id: i32, nickname: &str) -> Result<Option<User>>;
    async fn update_avatar(&self, user_id: i32, avatar_url: Option<&str>) -> Result<Option<User>>;

    // Score operations
    /// Store a finished game's score and raise the user's best score to it if
    /// higher. Returns the resulting best score, or `None` for an unknown user.
    async fn record_score(&self, user_id: i32, score: i32) -> Result<Option<i32>>;

    // Leaderboard operations
    /// Every user, in registration order
    async fn list_users(&self) -> Result<Vec<User>>;
    /// Users with a positive best score, best first
    async fn get_top_scores(&self, limit: usize) -> Result<Vec<User>>;
}
