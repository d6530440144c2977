use async_trait::async_trait;
use thiserror::Error;

use common::api::{Account, ScoreAck};
use common::{LeaderboardEntry, SortKey, SortOrder};

/// Failures the account and score collaborators report to the player
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("User already exists")]
    Duplicate,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("User not found")]
    NotFound,
    #[error("{0}")]
    Invalid(String),
    #[error("{0:#}")]
    Transport(#[from] anyhow::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[async_trait]
pub trait AccountService: Send + Sync {
    async fn register(&self, nickname: &str, email: &str, password: &str) -> ServiceResult<Account>;

    async fn login(&self, email: &str, password: &str) -> ServiceResult<Account>;

    async fn rename_account(&self, user_id: i32, nickname: &str) -> ServiceResult<Account>;

    /// `None` clears the avatar
    async fn set_avatar(&self, user_id: i32, avatar: Option<&str>) -> ServiceResult<Account>;
}

#[async_trait]
pub trait ScoreService: Send + Sync {
    /// Record a finished game. The stored best becomes `max(best, score)`.
    async fn submit_score(&self, user_id: i32, score: u32) -> ServiceResult<ScoreAck>;

    async fn query_leaderboard(
        &self,
        sort_key: SortKey,
        order: SortOrder,
    ) -> ServiceResult<Vec<LeaderboardEntry>>;
}

/// Both halves of a persistence back end
pub trait Store: AccountService + ScoreService {}

impl<T: AccountService + ScoreService> Store for T {}
