use anyhow::Result;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use server::api::{AppState, build_router};
use server::db::MemoryDatabase;

/// Drives the API router in-process over a fresh in-memory store
pub struct TestClient {
    app: Router,
    pub db: Arc<MemoryDatabase>,
}

impl TestClient {
    pub fn new() -> Self {
        Self::with_leaderboard_limit(10)
    }

    pub fn with_leaderboard_limit(leaderboard_limit: usize) -> Self {
        let db = Arc::new(MemoryDatabase::new());
        let state = AppState {
            db: db.clone(),
            leaderboard_limit,
            // Lowest cost bcrypt accepts, keeps the tests fast
            bcrypt_cost: 4,
        };
        Self {
            app: build_router(state, None),
            db,
        }
    }

    pub async fn get(&self, uri: &str) -> Result<(StatusCode, Value)> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())?;
        self.send(request).await
    }

    pub async fn post<T: Serialize>(&self, uri: &str, body: &T) -> Result<(StatusCode, Value)> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(body)?))?;
        self.send(request).await
    }

    /// Post a body as-is, for requests that are not valid JSON
    pub async fn post_raw(&self, uri: &str, body: &str) -> Result<(StatusCode, Value)> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))?;
        self.send(request).await
    }

    /// Register an account and return its id
    pub async fn register(&self, email: &str, nickname: &str) -> Result<i32> {
        let (status, body) = self
            .post(
                "/api/register",
                &serde_json::json!({ "email": email, "password": "secret", "nickname": nickname }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "register failed: {} {}", status, body);
        body["id"]
            .as_i64()
            .map(|id| id as i32)
            .ok_or_else(|| anyhow::anyhow!("register response without id: {}", body))
    }

    pub async fn submit_score(&self, user_id: i32, score: i64) -> Result<StatusCode> {
        let (status, _) = self
            .post("/api/score", &serde_json::json!({ "userId": user_id, "score": score }))
            .await?;
        Ok(status)
    }

    async fn send(&self, request: Request<Body>) -> Result<(StatusCode, Value)> {
        let response = self.app.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        Ok((status, value))
    }
}
