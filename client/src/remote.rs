use anyhow::{Context, anyhow};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use common::api::{
    Account, ChangeAvatarRequest, ChangeNameRequest, ErrorResponse, LoginRequest,
    RegisterRequest, ScoreAck, ScoreRequest,
};
use common::leaderboard::parse_entries;
use common::{LeaderboardEntry, SortKey, SortOrder};

use crate::service::{AccountService, ScoreService, ServiceError, ServiceResult};

/// Account and score services backed by the HTTP API
#[derive(Clone)]
pub struct RemoteStore {
    client: Client,
    base_url: Url,
}

impl RemoteStore {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        Ok(Self {
            client: Client::new(),
            base_url: normalize_base_url(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> ServiceResult<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("Failed to build URL for {}", path))
            .map_err(ServiceError::from)
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> ServiceResult<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let endpoint = self.endpoint(path)?;
        debug!("POST {}", endpoint);

        let response = self
            .client
            .post(endpoint)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", path))?;

        let response = check_status(response).await?;
        let value = response
            .json::<R>()
            .await
            .with_context(|| format!("Failed to parse response from {}", path))?;
        Ok(value)
    }
}

/// Map API error statuses onto the service errors callers match on
async fn check_status(response: Response) -> ServiceResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.error)
        .unwrap_or(body);

    Err(match status {
        StatusCode::CONFLICT => ServiceError::Duplicate,
        StatusCode::UNAUTHORIZED => ServiceError::InvalidCredentials,
        StatusCode::NOT_FOUND => ServiceError::NotFound,
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            ServiceError::Invalid(message)
        }
        _ => ServiceError::Transport(anyhow!(
            "Request failed with status {}: {}",
            status,
            message
        )),
    })
}

fn normalize_base_url(raw: &str) -> anyhow::Result<Url> {
    Url::parse(raw)
        .ok()
        .filter(|url| !url.cannot_be_a_base())
        .map_or_else(|| Url::parse(&format!("http://{raw}")), Ok)
        .context("Invalid server URL")
}

#[async_trait]
impl AccountService for RemoteStore {
    async fn register(&self, nickname: &str, email: &str, password: &str) -> ServiceResult<Account> {
        let request = RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            nickname: nickname.to_string(),
        };
        self.post("/api/register", &request).await
    }

    async fn login(&self, email: &str, password: &str) -> ServiceResult<Account> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.post("/api/login", &request).await
    }

    async fn rename_account(&self, user_id: i32, nickname: &str) -> ServiceResult<Account> {
        let request = ChangeNameRequest {
            user_id: Some(user_id),
            new_name: nickname.to_string(),
        };
        self.post("/api/change-name", &request).await
    }

    async fn set_avatar(&self, user_id: i32, avatar: Option<&str>) -> ServiceResult<Account> {
        let request = ChangeAvatarRequest {
            user_id: Some(user_id),
            avatar: avatar.map(str::to_string),
        };
        self.post("/api/change-avatar", &request).await
    }
}

#[async_trait]
impl ScoreService for RemoteStore {
    async fn submit_score(&self, user_id: i32, score: u32) -> ServiceResult<ScoreAck> {
        let request = ScoreRequest {
            user_id: Some(user_id),
            score: Some(i64::from(score)),
        };
        self.post("/api/score", &request).await
    }

    async fn query_leaderboard(
        &self,
        sort_key: SortKey,
        order: SortOrder,
    ) -> ServiceResult<Vec<LeaderboardEntry>> {
        let mut endpoint = self.endpoint("/api/users")?;
        endpoint
            .query_pairs_mut()
            .append_pair("sortBy", sort_key.as_str())
            .append_pair("order", order.as_str());

        let response = self
            .client
            .get(endpoint)
            .send()
            .await
            .context("Failed to fetch leaderboard")?;
        let response = check_status(response).await?;
        let body = response.text().await.context("Failed to read leaderboard")?;

        // A body that does not decode counts as an empty board
        Ok(parse_entries(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_accepts_bare_host() {
        let store = RemoteStore::new("localhost:3000").unwrap();
        assert_eq!(store.base_url().as_str(), "http://localhost:3000/");
        assert_eq!(
            store.endpoint("/api/login").unwrap().as_str(),
            "http://localhost:3000/api/login"
        );
    }

    #[test]
    fn base_url_keeps_scheme() {
        let store = RemoteStore::new("https://snake.example.com").unwrap();
        assert_eq!(store.base_url().scheme(), "https");
    }
}
