use anyhow::Context;
use axum::{Json, extract::State};
use bcrypt::{hash, verify};
use tracing::info;

use common::api::{
    Account, ChangeAvatarRequest, ChangeNameRequest, LoginRequest, RegisterRequest, normalize_email,
};

use super::error::ApiError;
use super::extract::ApiJson;
use super::server::AppState;

const MAX_NICKNAME_CHARS: usize = 32;

/// Validates nickname format
/// - Must not be blank
/// - Must be at most 32 characters long
/// - Must not contain control characters
fn validate_nickname(nickname: &str) -> Result<(), ApiError> {
    if nickname.is_empty() {
        return Err(ApiError::BadRequest("Nickname must not be empty".to_string()));
    }
    if nickname.chars().count() > MAX_NICKNAME_CHARS {
        return Err(ApiError::BadRequest(format!(
            "Nickname must be at most {} characters long",
            MAX_NICKNAME_CHARS
        )));
    }
    if nickname.chars().any(char::is_control) {
        return Err(ApiError::BadRequest(
            "Nickname must not contain control characters".to_string(),
        ));
    }
    Ok(())
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<Json<Account>, ApiError> {
    let email = normalize_email(&req.email);
    let nickname = req.nickname.trim();
    let password = req.password.trim();

    if email.is_empty() || nickname.is_empty() || password.is_empty() {
        return Err(ApiError::BadRequest("Please fill in all fields".to_string()));
    }
    validate_nickname(nickname)?;

    if state.db.get_user_by_email(&email).await?.is_some() {
        return Err(ApiError::Conflict("User already exists".to_string()));
    }

    let password_hash = hash(password, state.bcrypt_cost).context("Failed to hash password")?;

    // A concurrent registration can still win the race; the store reports it as a duplicate
    let user = state.db.create_user(&email, nickname, &password_hash).await?;

    info!(user_id = user.id, "User registered successfully: {}", user.nickname);
    Ok(Json(user.to_account()))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<Account>, ApiError> {
    let email = normalize_email(&req.email);
    let password = req.password.trim();

    if email.is_empty() || password.is_empty() {
        return Err(ApiError::BadRequest("Please provide email and password".to_string()));
    }

    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let user = state.db.get_user_by_email(&email).await?.ok_or_else(invalid)?;

    let is_valid = verify(password, &user.password_hash).context("Failed to verify password")?;
    if !is_valid {
        return Err(invalid());
    }

    info!(user_id = user.id, "User logged in successfully: {}", user.nickname);
    Ok(Json(user.to_account()))
}

pub async fn change_name(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ChangeNameRequest>,
) -> Result<Json<Account>, ApiError> {
    let new_name = req.new_name.trim();
    let Some(user_id) = req.user_id.filter(|_| !new_name.is_empty()) else {
        return Err(ApiError::BadRequest("Missing userId or new name".to_string()));
    };
    validate_nickname(new_name)?;

    let user = state
        .db
        .update_nickname(user_id, new_name)
        .await?
        .ok_or_else(ApiError::user_not_found)?;

    info!(user_id, "Nickname changed to {}", user.nickname);
    Ok(Json(user.to_account()))
}

pub async fn change_avatar(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ChangeAvatarRequest>,
) -> Result<Json<Account>, ApiError> {
    let Some(user_id) = req.user_id else {
        return Err(ApiError::BadRequest("Missing userId".to_string()));
    };
    let avatar = req.avatar.as_deref().map(str::trim).filter(|a| !a.is_empty());

    let user = state
        .db
        .update_avatar(user_id, avatar)
        .await?
        .ok_or_else(ApiError::user_not_found)?;

    info!(user_id, has_avatar = avatar.is_some(), "Avatar updated");
    Ok(Json(user.to_account()))
}
