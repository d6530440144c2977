use anyhow::Context;
use async_trait::async_trait;
use bcrypt::{hash, verify};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

use common::api::{Account, ScoreAck, normalize_email};
use common::leaderboard::rank;
use common::{LeaderboardEntry, SortKey, SortOrder};

use crate::service::{AccountService, ScoreService, ServiceError, ServiceResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredAccount {
    #[serde(flatten)]
    account: Account,
    password_hash: String,
}

impl StoredAccount {
    fn to_leaderboard_entry(&self) -> LeaderboardEntry {
        LeaderboardEntry {
            user_id: self.account.id,
            nickname: self.account.nickname.clone(),
            avatar: self.account.avatar.clone(),
            score: self.account.best_score,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocalData {
    next_user_id: i32,
    accounts: Vec<StoredAccount>,
}

/// Account and score services kept in a JSON file, for playing offline
pub struct LocalStore {
    path: PathBuf,
    bcrypt_cost: u32,
    data: Mutex<LocalData>,
}

impl LocalStore {
    /// Open the store at `path`, starting empty when the file does not exist yet
    pub async fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        Self::open_with_cost(path, bcrypt::DEFAULT_COST).await
    }

    pub async fn open_with_cost(path: impl AsRef<Path>, bcrypt_cost: u32) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse local store {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No local store at {}, starting empty", path.display());
                LocalData::default()
            }
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("Failed to read local store {}", path.display())));
            }
        };

        Ok(Self {
            path,
            bcrypt_cost,
            data: Mutex::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write through a temporary file so a crash never leaves half a store behind
    async fn save(&self, data: &LocalData) -> ServiceResult<()> {
        let json = serde_json::to_string_pretty(data).context("Failed to serialize local store")?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json)
            .await
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        debug!("Saved {} accounts to {}", data.accounts.len(), self.path.display());
        Ok(())
    }
}

fn find_mut(data: &mut LocalData, user_id: i32) -> ServiceResult<&mut StoredAccount> {
    data.accounts
        .iter_mut()
        .find(|stored| stored.account.id == user_id)
        .ok_or(ServiceError::NotFound)
}

fn require_nickname(nickname: &str) -> ServiceResult<&str> {
    let nickname = nickname.trim();
    if nickname.is_empty() {
        return Err(ServiceError::Invalid("Nickname must not be empty".to_string()));
    }
    Ok(nickname)
}

#[async_trait]
impl AccountService for LocalStore {
    async fn register(&self, nickname: &str, email: &str, password: &str) -> ServiceResult<Account> {
        let email = normalize_email(email);
        let nickname = nickname.trim();
        let password = password.trim();
        if email.is_empty() || nickname.is_empty() || password.is_empty() {
            return Err(ServiceError::Invalid("Please fill in all fields".to_string()));
        }

        let mut data = self.data.lock().await;
        if data.accounts.iter().any(|stored| stored.account.email == email) {
            return Err(ServiceError::Duplicate);
        }

        let password_hash = hash(password, self.bcrypt_cost).context("Failed to hash password")?;
        data.next_user_id += 1;
        let account = Account {
            id: data.next_user_id,
            email,
            nickname: nickname.to_string(),
            best_score: 0,
            avatar: None,
        };
        data.accounts.push(StoredAccount {
            account: account.clone(),
            password_hash,
        });
        self.save(&data).await?;

        info!(user_id = account.id, "Registered local account {}", account.nickname);
        Ok(account)
    }

    async fn login(&self, email: &str, password: &str) -> ServiceResult<Account> {
        let email = normalize_email(email);
        let password = password.trim();
        if email.is_empty() || password.is_empty() {
            return Err(ServiceError::Invalid("Please provide email and password".to_string()));
        }

        let data = self.data.lock().await;
        let stored = data
            .accounts
            .iter()
            .find(|stored| stored.account.email == email)
            .ok_or(ServiceError::InvalidCredentials)?;

        let is_valid =
            verify(password, &stored.password_hash).context("Failed to verify password")?;
        if !is_valid {
            return Err(ServiceError::InvalidCredentials);
        }
        Ok(stored.account.clone())
    }

    async fn rename_account(&self, user_id: i32, nickname: &str) -> ServiceResult<Account> {
        let nickname = require_nickname(nickname)?;
        let mut data = self.data.lock().await;
        let stored = find_mut(&mut data, user_id)?;
        stored.account.nickname = nickname.to_string();
        let account = stored.account.clone();
        self.save(&data).await?;
        Ok(account)
    }

    async fn set_avatar(&self, user_id: i32, avatar: Option<&str>) -> ServiceResult<Account> {
        let avatar = avatar.map(str::trim).filter(|a| !a.is_empty());
        let mut data = self.data.lock().await;
        let stored = find_mut(&mut data, user_id)?;
        stored.account.avatar = avatar.map(str::to_string);
        let account = stored.account.clone();
        self.save(&data).await?;
        Ok(account)
    }
}

#[async_trait]
impl ScoreService for LocalStore {
    async fn submit_score(&self, user_id: i32, score: u32) -> ServiceResult<ScoreAck> {
        if score == 0 {
            return Err(ServiceError::Invalid("Invalid score".to_string()));
        }

        let mut data = self.data.lock().await;
        let stored = find_mut(&mut data, user_id)?;
        stored.account.best_score = stored.account.best_score.max(score);
        let best_score = stored.account.best_score;
        self.save(&data).await?;

        info!(user_id, score, best_score, "Score recorded locally");
        Ok(ScoreAck { success: true })
    }

    async fn query_leaderboard(
        &self,
        sort_key: SortKey,
        order: SortOrder,
    ) -> ServiceResult<Vec<LeaderboardEntry>> {
        let data = self.data.lock().await;
        let entries: Vec<LeaderboardEntry> =
            data.accounts.iter().map(StoredAccount::to_leaderboard_entry).collect();
        Ok(rank(&entries, sort_key, order, None).entries)
    }
}
