//! Identity Toolkit REST adapter for hosted deployments.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use super::identity::{AuthFailure, Identity, IdentityProvider};

const BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";

pub struct FirebaseIdentity {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    email: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl FirebaseIdentity {
    pub fn new(api_key: String) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
            api_key,
        })
    }

    async fn call(&self, action: &str, email: &str, password: &str) -> Result<Identity, AuthFailure> {
        let url = format!("{}/accounts:{}?key={}", self.base_url, action, self.api_key);
        let response = self
            .client
            .post(url)
            .json(&PasswordRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, action, "identity provider request failed");
                if e.is_connect() || e.is_timeout() {
                    AuthFailure::Offline
                } else {
                    AuthFailure::Provider(e.to_string())
                }
            })?;

        if response.status().is_success() {
            let account: AccountResponse = response
                .json()
                .await
                .map_err(|e| AuthFailure::Provider(e.to_string()))?;
            debug!(user_id = %account.local_id, action, "identity provider accepted credentials");
            return Ok(Identity {
                id: account.local_id,
                email: account.email,
            });
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(envelope) => Err(map_error_code(&envelope.error.message)),
            Err(_) => {
                error!(%status, body = %body, "unexpected identity provider response");
                Err(AuthFailure::Provider(format!("status {status}")))
            }
        }
    }
}

/// Error messages look like `WEAK_PASSWORD : Password should be ...`; only the
/// leading code matters.
pub(crate) fn map_error_code(message: &str) -> AuthFailure {
    let code = message.split_whitespace().next().unwrap_or_default();
    match code {
        "EMAIL_NOT_FOUND" | "USER_NOT_FOUND" => AuthFailure::UnknownAccount,
        "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => AuthFailure::WrongCredential,
        "INVALID_EMAIL" | "MISSING_EMAIL" => AuthFailure::MalformedIdentifier,
        "TOO_MANY_ATTEMPTS_TRY_LATER" => AuthFailure::RateLimited,
        "EMAIL_EXISTS" => AuthFailure::AlreadyRegistered,
        "WEAK_PASSWORD" => AuthFailure::WeakPassword,
        _ => AuthFailure::Provider(message.to_string()),
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    #[instrument(skip(self, password))]
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthFailure> {
        self.call("signUp", email, password).await
    }

    #[instrument(skip(self, password))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthFailure> {
        self.call("signInWithPassword", email, password).await
    }
}
