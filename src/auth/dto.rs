use serde::{Deserialize, Serialize};

use crate::{
    profiles::repo_types::UserProfile,
    session::{Role, Session},
};

/// Request body for registration.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub reg_no: String,
    pub password: String,
    pub confirm_password: String,
}

/// Request body for login. `remember` keeps the page cookie past the
/// browser session.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub reg_no: String,
    pub password: String,
    #[serde(default)]
    pub remember: bool,
}

/// Request body for token refresh.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Response returned after login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub redirect: &'static str,
    pub user: PublicUser,
}

/// Public part of the profile returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub reg_no: String,
    pub role: Option<String>,
}

impl From<UserProfile> for PublicUser {
    fn from(p: UserProfile) -> Self {
        Self {
            id: p.id,
            email: p.email,
            name: p.name,
            reg_no: p.reg_no,
            role: p.role,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: String,
    pub email: String,
    pub role: Option<Role>,
    pub role_status: &'static str,
    pub profile: Option<UserProfile>,
}

impl From<Session> for MeResponse {
    fn from(s: Session) -> Self {
        Self {
            role: s.effective_role(),
            role_status: s.role.status_label(),
            id: s.user_id,
            email: s.email,
            profile: s.profile,
        }
    }
}
