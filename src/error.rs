use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid username and/or password")]
    InvalidCredentials,

    #[error("Username already taken")]
    UsernameTaken,

    #[error("{0}")]
    Validation(String),

    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("Insufficient cash")]
    InsufficientFunds,

    #[error("Insufficient shares")]
    InsufficientShares,

    #[error("Quote lookup failed: {0}")]
    Quote(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::InvalidCredentials => StatusCode::FORBIDDEN,
            AppError::UsernameTaken => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::UnknownSymbol(_) => StatusCode::NOT_FOUND,
            AppError::InsufficientFunds => StatusCode::PAYMENT_REQUIRED,
            AppError::InsufficientShares => StatusCode::CONFLICT,
            AppError::Quote(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // apology body: user-facing message plus the numeric code;
        // database/internal details are logged, never sent to the client
        let message = match &self {
            AppError::Database(e) => {
                log::error!("database error: {e}");
                "Database error".to_string()
            }
            AppError::Internal(e) => {
                log::error!("internal error: {e}");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
