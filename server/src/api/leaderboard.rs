use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use tracing::debug;

use common::leaderboard::{self, LeaderboardEntry, SortKey, SortOrder};
use common::MAX_LEADERBOARD_LIMIT;

use super::error::ApiError;
use super::server::AppState;

/// Query parameters for the leaderboard endpoint
#[derive(Debug, Default, Deserialize)]
pub struct LeaderboardQuery {
    /// Number of entries to return (default from config, max 100)
    pub limit: Option<usize>,
}

/// Query parameters for the user listing endpoint
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsersQuery {
    /// `score` or `name`
    pub sort_by: Option<String>,
    /// `asc` or `desc`
    pub order: Option<String>,
}

/// Best scores, highest first. Accounts that never scored are left out.
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(state.leaderboard_limit)
        .clamp(1, MAX_LEADERBOARD_LIMIT);

    let users = state.db.get_top_scores(limit).await?;
    let entries: Vec<LeaderboardEntry> = users.iter().map(|u| u.to_leaderboard_entry()).collect();

    debug!("Returning {} leaderboard entries", entries.len());
    Ok(Json(entries))
}

/// Every account, ordered by the requested key
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UsersQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    let sort_key = query.sort_by.as_deref().map(SortKey::parse).unwrap_or_default();
    let order = query.order.as_deref().map(SortOrder::parse).unwrap_or_default();

    let users = state.db.list_users().await?;
    let entries: Vec<LeaderboardEntry> = users.iter().map(|u| u.to_leaderboard_entry()).collect();
    let ranked = leaderboard::rank(&entries, sort_key, order, None);

    debug!(
        sort_by = sort_key.as_str(),
        order = order.as_str(),
        "Listing {} users",
        ranked.entries.len()
    );
    Ok(Json(ranked.entries))
}
