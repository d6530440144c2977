use axum::{Json, extract::State};
use tracing::info;

use common::api::{ScoreAck, ScoreRequest};

use super::error::ApiError;
use super::extract::ApiJson;
use super::server::AppState;

/// Record a finished game. Only positive scores are accepted; the account's
/// best score is raised when the new one beats it.
pub async fn submit_score(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ScoreRequest>,
) -> Result<Json<ScoreAck>, ApiError> {
    let invalid = || ApiError::BadRequest("Invalid score".to_string());

    let user_id = req
        .user_id
        .ok_or_else(|| ApiError::BadRequest("Missing userId".to_string()))?;
    let score = req.score.ok_or_else(invalid)?;
    if score <= 0 {
        return Err(invalid());
    }
    let score = i32::try_from(score).map_err(|_| invalid())?;

    let best_score = state
        .db
        .record_score(user_id, score)
        .await?
        .ok_or_else(ApiError::user_not_found)?;

    info!(user_id, score, best_score, "Score recorded");
    Ok(Json(ScoreAck { success: true }))
}
