use axum::extract::FromRef;
use tracing::{error, info, instrument, warn};

use super::{
    dto::{LoginRequest, RefreshRequest, RegisterRequest, TokenPair},
    jwt::JwtKeys,
    regno::{canonical_reg_no, reg_no_to_identifier, validate_reg_no},
};
use crate::{
    error::{AppError, AppResult},
    profiles::repo_types::{NewProfile, UserProfile},
    session::{guard::UNAUTHORIZED_PATH, Role, RoleResolution},
    state::AppState,
};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Where a freshly signed-in user lands.
pub fn landing_path(role: &RoleResolution) -> &'static str {
    match role.effective() {
        Some(Role::Admin) => "/admin",
        Some(Role::Student) => "/dashboard",
        None => UNAUTHORIZED_PATH,
    }
}

fn check_reg_no(reg_no: &str) -> AppResult<()> {
    if !validate_reg_no(reg_no) {
        return Err(AppError::validation(
            "Invalid registration number format. Use format: 2020/241762",
        ));
    }
    Ok(())
}

/// Length in UTF-16 code units, the unit browsers and the identity provider
/// count in.
fn check_password(password: &str) -> AppResult<()> {
    if password.encode_utf16().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(
            "Password must be at least 6 characters long",
        ));
    }
    Ok(())
}

/// Runs before any identity-provider call.
pub fn validate_registration(req: &RegisterRequest) -> AppResult<()> {
    if req.name.trim().is_empty() {
        return Err(AppError::validation("Please enter your full name"));
    }
    check_reg_no(&req.reg_no)?;
    check_password(&req.password)?;
    if req.password != req.confirm_password {
        return Err(AppError::validation("Passwords do not match"));
    }
    Ok(())
}

pub fn validate_login(req: &LoginRequest) -> AppResult<()> {
    check_reg_no(&req.reg_no)?;
    check_password(&req.password)
}

pub fn issue_tokens(keys: &JwtKeys, user_id: &str, email: &str) -> AppResult<TokenPair> {
    Ok(TokenPair {
        access_token: keys.sign_access(user_id, email)?,
        refresh_token: keys.sign_refresh(user_id, email)?,
    })
}

#[instrument(skip(st, req), fields(reg_no = %req.reg_no))]
pub async fn register(st: &AppState, req: RegisterRequest) -> AppResult<UserProfile> {
    validate_registration(&req)?;
    let reg_no = req.reg_no.as_str();
    let identifier = reg_no_to_identifier(reg_no, &st.config.portal.email_domain);

    let identity = st.identity.sign_up(&identifier, &req.password).await?;
    let profile = st
        .profiles
        .create(&NewProfile {
            id: identity.id.clone(),
            email: identity.email,
            name: req.name.trim().to_string(),
            reg_no: canonical_reg_no(reg_no),
            department: st.config.portal.department.clone(),
            role: Role::Student.as_str().to_string(),
        })
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %identity.id, "identity created but profile write failed");
            AppError::Internal(e)
        })?;

    info!(user_id = %profile.id, "student registered");
    Ok(profile)
}

/// A successful sign-in, ready to be sent as JSON or as a cookie.
#[derive(Debug)]
pub struct SignedIn {
    pub tokens: TokenPair,
    pub profile: UserProfile,
    pub redirect: &'static str,
}

#[instrument(skip(st, req), fields(reg_no = %req.reg_no))]
pub async fn login(st: &AppState, req: &LoginRequest) -> AppResult<SignedIn> {
    validate_login(req)?;
    let identifier = reg_no_to_identifier(&req.reg_no, &st.config.portal.email_domain);

    let identity = st.identity.sign_in(&identifier, &req.password).await?;
    let profile = match st.profiles.get(&identity.id).await? {
        Some(p) => p,
        None => {
            warn!(user_id = %identity.id, "identity has no profile");
            return Err(AppError::ProfileMissing);
        }
    };

    let role = Role::resolve(profile.role.as_deref());
    let redirect = landing_path(&role);
    let tokens = issue_tokens(&JwtKeys::from_ref(st), &identity.id, &identity.email)?;

    info!(user_id = %identity.id, role = role.status_label(), redirect, "user logged in");
    Ok(SignedIn {
        tokens,
        profile,
        redirect,
    })
}

pub fn refresh(st: &AppState, req: &RefreshRequest) -> AppResult<TokenPair> {
    let keys = JwtKeys::from_ref(st);
    let claims = keys.verify_refresh(&req.refresh_token).map_err(|e| {
        warn!(error = %e, "refresh token rejected");
        AppError::Unauthenticated
    })?;
    issue_tokens(&keys, &claims.sub, &claims.email)
}
