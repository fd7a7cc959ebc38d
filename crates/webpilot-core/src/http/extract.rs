use axum::extract::FromRequest;

use crate::http::ApiError;

/// `Json` extractor whose rejections use the API error body
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);
