use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::LeaderboardEntry;
use common::api::Account;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub nickname: String,
    pub password_hash: String,
    pub best_score: i32,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Public view of the account, without the password hash
    pub fn to_account(&self) -> Account {
        Account {
            id: self.id,
            email: self.email.clone(),
            nickname: self.nickname.clone(),
            best_score: self.best_score.max(0) as u32,
            avatar: self.avatar_url.clone(),
        }
    }

    pub fn to_leaderboard_entry(&self) -> LeaderboardEntry {
        LeaderboardEntry {
            user_id: self.id,
            nickname: self.nickname.clone(),
            avatar: self.avatar_url.clone(),
            score: self.best_score.max(0) as u32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ScoreRecord {
    pub id: i32,
    pub user_id: i32,
    pub score: i32,
    pub created_at: DateTime<Utc>,
}
