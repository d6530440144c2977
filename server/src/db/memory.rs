use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::models::*;
use super::{Database, DbError};

#[derive(Default)]
struct MemoryState {
    users: BTreeMap<i32, User>,
    scores: Vec<ScoreRecord>,
    next_user_id: i32,
    next_score_id: i32,
}

/// Process-local store. Used when no database URL is configured and in tests.
#[derive(Default)]
pub struct MemoryDatabase {
    state: RwLock<MemoryState>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of score rows recorded for a user
    pub async fn score_count(&self, user_id: i32) -> usize {
        let state = self.state.read().await;
        state.scores.iter().filter(|s| s.user_id == user_id).count()
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn create_user(&self, email: &str, nickname: &str, password_hash: &str) -> Result<User> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.email == email) {
            return Err(DbError::DuplicateEmail(email.to_string()).into());
        }

        state.next_user_id += 1;
        let user = User {
            id: state.next_user_id,
            email: email.to_string(),
            nickname: nickname.to_string(),
            password_hash: password_hash.to_string(),
            best_score: 0,
            avatar_url: None,
            created_at: Utc::now(),
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user_by_id(&self, user_id: i32) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&user_id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_nickname(&self, user_id: i32, nickname: &str) -> Result<Option<User>> {
        let mut state = self.state.write().await;
        Ok(state.users.get_mut(&user_id).map(|user| {
            user.nickname = nickname.to_string();
            user.clone()
        }))
    }

    async fn update_avatar(&self, user_id: i32, avatar_url: Option<&str>) -> Result<Option<User>> {
        let mut state = self.state.write().await;
        Ok(state.users.get_mut(&user_id).map(|user| {
            user.avatar_url = avatar_url.map(str::to_string);
            user.clone()
        }))
    }

    async fn record_score(&self, user_id: i32, score: i32) -> Result<Option<i32>> {
        let mut state = self.state.write().await;
        let Some(user) = state.users.get_mut(&user_id) else {
            return Ok(None);
        };
        user.best_score = user.best_score.max(score);
        let best_score = user.best_score;

        state.next_score_id += 1;
        let record = ScoreRecord {
            id: state.next_score_id,
            user_id,
            score,
            created_at: Utc::now(),
        };
        state.scores.push(record);
        Ok(Some(best_score))
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.state.read().await.users.values().cloned().collect())
    }

    async fn get_top_scores(&self, limit: usize) -> Result<Vec<User>> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state
            .users
            .values()
            .filter(|u| u.best_score > 0)
            .cloned()
            .collect();
        // Stable sort over id order matches `ORDER BY best_score DESC, id ASC`
        users.sort_by(|a, b| b.best_score.cmp(&a.best_score));
        users.truncate(limit);
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let db = MemoryDatabase::new();
        db.create_user("a@b.c", "Ann", "hash").await.unwrap();
        let err = db.create_user("a@b.c", "Other", "hash").await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<DbError>(),
            Some(&DbError::DuplicateEmail("a@b.c".to_string()))
        );
    }

    #[tokio::test]
    async fn best_score_only_goes_up() {
        let db = MemoryDatabase::new();
        let user = db.create_user("a@b.c", "Ann", "hash").await.unwrap();

        assert_eq!(db.record_score(user.id, 10).await.unwrap(), Some(10));
        assert_eq!(db.record_score(user.id, 4).await.unwrap(), Some(10));
        assert_eq!(db.record_score(user.id, 12).await.unwrap(), Some(12));
        assert_eq!(db.score_count(user.id).await, 3);
        assert_eq!(db.record_score(999, 12).await.unwrap(), None);

        let stored = db.get_user_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.best_score, 12);
        assert!(db.get_user_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn top_scores_skip_zero_and_keep_id_order_on_ties() {
        let db = MemoryDatabase::new();
        let a = db.create_user("a@x", "A", "h").await.unwrap();
        let b = db.create_user("b@x", "B", "h").await.unwrap();
        let c = db.create_user("c@x", "C", "h").await.unwrap();
        db.create_user("d@x", "D", "h").await.unwrap();
        db.record_score(a.id, 5).await.unwrap();
        db.record_score(b.id, 9).await.unwrap();
        db.record_score(c.id, 5).await.unwrap();

        let top: Vec<i32> = db.get_top_scores(10).await.unwrap().iter().map(|u| u.id).collect();
        assert_eq!(top, vec![b.id, a.id, c.id]);
        assert_eq!(db.get_top_scores(1).await.unwrap().len(), 1);
    }
}
