use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::auth::identity::AuthFailure;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Auth(#[from] AuthFailure),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Access denied")]
    Forbidden,

    #[error("Session is still loading")]
    SessionResolving,

    #[error("{0} not found")]
    NotFound(&'static str),

    /// Signed in, but no profile row exists for the identity.
    #[error("User data not found. Please contact support.")]
    ProfileMissing,

    #[error("{0}")]
    Conflict(String),

    #[error("Payment provider error: {0}")]
    Gateway(String),

    /// An upstream service answered, but not usefully.
    #[error("{0}")]
    Upstream(&'static str),

    #[error("Internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(failure) => failure.status_code(),
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::SessionResolving => StatusCode::SERVICE_UNAVAILABLE,
            AppError::NotFound(_) | AppError::ProfileMissing => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Gateway(_) | AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show on a page or in a JSON body.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Auth(failure) => failure.user_message().to_string(),
            AppError::Gateway(_) => "Payment provider unavailable. Please try again.".into(),
            AppError::Internal(_) => "Something went wrong. Please try again.".into(),
            other => other.to_string(),
        }
    }

    /// Logs at a level matching who is at fault.
    pub fn log(&self) {
        match self {
            AppError::Internal(e) => tracing::error!(error = %format!("{e:#}"), "internal error"),
            AppError::Gateway(msg) => tracing::error!(error = %msg, "payment gateway error"),
            AppError::Upstream(msg) => tracing::warn!(error = %msg, "upstream error"),
            AppError::Auth(failure) => tracing::info!(failure = ?failure, "authentication failed"),
            AppError::ProfileMissing => tracing::warn!("signed-in identity has no profile"),
            AppError::Unauthenticated | AppError::Forbidden => {
                tracing::info!("authorization error: {}", self)
            }
            _ => tracing::debug!("client error: {}", self),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();

        let status = self.status_code();
        let body = axum::Json(serde_json::json!({ "error": self.user_message() }));
        if matches!(self, AppError::SessionResolving) {
            return (status, [(header::RETRY_AFTER, "1")], body).into_response();
        }
        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
