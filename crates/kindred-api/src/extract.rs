use axum::extract::FromRequest;

use crate::error::ApiError;

/// `axum::Json` for request bodies, rejecting with an `ApiError` so a
/// malformed body still answers `{"detail": ...}`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);
