use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use kindred_db::DbError;
use kindred_types::api::ErrorBody;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("username taken")]
    UsernameTaken,

    /// Same message whether the user is unknown or the password is wrong.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("not authenticated")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),

    /// Body was not JSON, or did not match the expected shape.
    #[error("{}", .0.body_text())]
    InvalidBody(JsonRejection),

    #[error("database error: {0}")]
    Database(DbError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::DuplicateUsername(_) => Self::UsernameTaken,
            other => Self::Database(other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidBody(rejection)
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("blocking task failed: {}", err))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UsernameTaken | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials | Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::InvalidBody(rejection) => rejection.status(),
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Internal details are logged, never sent
        let detail = match &self {
            Self::Database(_) | Self::Internal(_) => {
                error!(error = %self, "request failed");
                "internal server error".to_string()
            }
            _ => self.to_string(),
        };

        (self.status(), Json(ErrorBody { detail })).into_response()
    }
}
