use async_trait::async_trait;
use axum::http::StatusCode;
use thiserror::Error;

/// An account as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub email: String,
}

/// Why the identity provider refused a credential pair.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthFailure {
    #[error("unknown account")]
    UnknownAccount,
    #[error("wrong credential")]
    WrongCredential,
    #[error("malformed identifier")]
    MalformedIdentifier,
    #[error("rate limited")]
    RateLimited,
    #[error("identity provider unreachable")]
    Offline,
    #[error("account already exists")]
    AlreadyRegistered,
    #[error("weak password")]
    WeakPassword,
    #[error("identity provider error: {0}")]
    Provider(String),
}

impl AuthFailure {
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthFailure::UnknownAccount => "No account found with this registration number",
            AuthFailure::WrongCredential => "Incorrect password. Please try again",
            AuthFailure::MalformedIdentifier => "Invalid registration number/email",
            AuthFailure::RateLimited => "Too many failed attempts. Please try again later",
            AuthFailure::Offline => "Network error. Please check your internet connection",
            AuthFailure::AlreadyRegistered => "This registration number is already registered",
            AuthFailure::WeakPassword => "Password is too weak. Please use a stronger password",
            AuthFailure::Provider(_) => "An error occurred during login",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthFailure::UnknownAccount | AuthFailure::WrongCredential => StatusCode::UNAUTHORIZED,
            AuthFailure::MalformedIdentifier | AuthFailure::WeakPassword => StatusCode::BAD_REQUEST,
            AuthFailure::AlreadyRegistered => StatusCode::CONFLICT,
            AuthFailure::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AuthFailure::Offline => StatusCode::SERVICE_UNAVAILABLE,
            AuthFailure::Provider(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

/// External credential authority. Implementations only check credentials;
/// profiles and roles live in the profile store.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthFailure>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthFailure>;
}
