use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{debug, info};

use super::models::*;
use super::{Database, DbError};

const USER_COLUMNS: &str = "id, email, nickname, password_hash, best_score, avatar_url, created_at";

pub struct PostgresDatabase {
    pool: PgPool,
}

impl PostgresDatabase {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        let db = Self::from_pool(pool);
        db.ensure_tables_exist().await?;
        Ok(db)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the tables this store needs when they are missing
    pub async fn ensure_tables_exist(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id SERIAL PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                nickname TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                best_score INTEGER NOT NULL DEFAULT 0,
                avatar_url TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create users table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS scores (
                id SERIAL PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                score INTEGER NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create scores table")?;

        info!("Database tables ready");
        Ok(())
    }
}

#[async_trait]
impl Database for PostgresDatabase {
    async fn create_user(&self, email: &str, nickname: &str, password_hash: &str) -> Result<User> {
        let query = format!(
            "INSERT INTO users (email, nickname, password_hash) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        );
        let result = sqlx::query_as::<_, User>(&query)
            .bind(email)
            .bind(nickname)
            .bind(password_hash)
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(user) => {
                debug!(user_id = user.id, "Inserted user");
                Ok(user)
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(DbError::DuplicateEmail(email.to_string()).into())
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to insert user")),
        }
    }

    async fn get_user_by_id(&self, user_id: i32) -> Result<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        sqlx::query_as::<_, User>(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to load user by id")
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to load user by email")
    }

    async fn update_nickname(&self, user_id: i32, nickname: &str) -> Result<Option<User>> {
        let query = format!(
            "UPDATE users SET nickname = $1 WHERE id = $2 RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&query)
            .bind(nickname)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to update nickname")
    }

    async fn update_avatar(&self, user_id: i32, avatar_url: Option<&str>) -> Result<Option<User>> {
        let query = format!(
            "UPDATE users SET avatar_url = $1 WHERE id = $2 RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&query)
            .bind(avatar_url)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to update avatar")
    }

    async fn record_score(&self, user_id: i32, score: i32) -> Result<Option<i32>> {
        let mut tx = self.pool.begin().await?;

        let best_score: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE users
            SET best_score = GREATEST(best_score, $1)
            WHERE id = $2
            RETURNING best_score
            "#,
        )
        .bind(score)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to update best score")?;

        let Some(best_score) = best_score else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query("INSERT INTO scores (user_id, score) VALUES ($1, $2)")
            .bind(user_id)
            .bind(score)
            .execute(&mut *tx)
            .await
            .context("Failed to insert score")?;

        tx.commit().await?;
        Ok(Some(best_score))
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let query = format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS);
        sqlx::query_as::<_, User>(&query)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list users")
    }

    async fn get_top_scores(&self, limit: usize) -> Result<Vec<User>> {
        let query = format!(
            "SELECT {} FROM users WHERE best_score > 0 ORDER BY best_score DESC, id ASC LIMIT $1",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&query)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .context("Failed to load top scores")
    }
}
