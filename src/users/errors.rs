use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

/// Everything that can go wrong while creating, loading or authenticating a user.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("a user with email {email} already exists")]
    UniquenessViolation { email: String },

    #[error("user has not been persisted yet")]
    NotPersisted,

    #[error("user {0} not found")]
    NotFound(Uuid),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account is inactive")]
    Inactive,

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl UserError {
    pub fn status(&self) -> StatusCode {
        match self {
            UserError::Validation(_) => StatusCode::BAD_REQUEST,
            UserError::UniquenessViolation { .. } => StatusCode::CONFLICT,
            UserError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            UserError::Inactive => StatusCode::FORBIDDEN,
            UserError::NotFound(_) => StatusCode::NOT_FOUND,
            UserError::NotPersisted
            | UserError::PasswordHash(_)
            | UserError::Token(_)
            | UserError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Handler-side conversion; internal details stay in the logs.
pub(crate) fn into_http(err: UserError) -> (StatusCode, String) {
    let status = err.status();
    if status.is_server_error() {
        tracing::error!(error = %err, "request failed");
        (status, "Internal server error".into())
    } else {
        (status, err.to_string())
    }
}
