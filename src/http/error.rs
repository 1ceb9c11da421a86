use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use thiserror::Error;

/// Request-level failure taxonomy. Every failure is terminal for the
/// request; nothing here retries.
#[derive(Error, Debug)]
pub enum AppError {
    /// No valid session. Protected pages redirect to login, never error.
    #[error("not signed in")]
    Auth,

    #[error("denied")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Auth => Redirect::to("/login").into_response(),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "Denied").into_response(),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            AppError::Store(e) => {
                tracing::error!("store error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "store error").into_response()
            }
            AppError::Internal(e) => {
                tracing::error!("internal error: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
            }
        }
    }
}
