use axum::extract::FromRequest;

use super::error::ApiError;

/// `Json` body extractor whose rejections use the API's `{error}` body and a 400 status
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);
