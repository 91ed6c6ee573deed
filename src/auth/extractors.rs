use std::convert::Infallible;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use tracing::debug;

use super::jwt::JwtKeys;
use crate::{
    error::AppError,
    session::{self, guard, Role, Session, SessionState},
    state::AppState,
};

pub const SESSION_COOKIE: &str = "dues_session";

/// Bearer token first, then the page cookie.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(auth) = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        if let Some(token) = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
        {
            return Some(token.trim().to_string());
        }
    }

    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|cookie| {
        let (name, value) = cookie.trim().split_once('=')?;
        (name == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
    })
}

/// `Set-Cookie` value for a signed-in browser. Without `remember`, the cookie
/// lives for the browser session only.
pub fn session_cookie(token: &str, remember: bool, max_age_secs: u64) -> String {
    let mut cookie = format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax");
    if remember {
        cookie.push_str(&format!("; Max-Age={max_age_secs}"));
    }
    cookie
}

pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Verifies the caller's token and reads their profile once.
pub async fn session_for(headers: &HeaderMap, state: &AppState) -> SessionState {
    let Some(token) = token_from_headers(headers) else {
        return SessionState::Unauthenticated;
    };
    let keys = JwtKeys::from_ref(state);
    match keys.verify_access(&token) {
        Ok(claims) => {
            session::resolve(
                state.profiles.as_ref(),
                &claims,
                state.config.portal.session_resolve_timeout,
            )
            .await
        }
        Err(e) => {
            debug!(error = %e, "rejected session token");
            SessionState::Unauthenticated
        }
    }
}

/// The caller's session state, whatever it is. Reuses the state the page
/// guard already resolved for this request.
pub struct CurrentSession(pub SessionState);

#[async_trait]
impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(resolved) = parts.extensions.get::<SessionState>() {
            return Ok(CurrentSession(resolved.clone()));
        }
        let resolved = session_for(&parts.headers, state).await;
        parts.extensions.insert(resolved.clone());
        Ok(CurrentSession(resolved))
    }
}

async fn require(
    parts: &mut Parts,
    state: &AppState,
    role: Option<Role>,
) -> Result<Session, AppError> {
    let CurrentSession(resolved) = match CurrentSession::from_request_parts(parts, state).await {
        Ok(current) => current,
        Err(never) => match never {},
    };
    guard::check(&resolved, role)?;
    match resolved {
        SessionState::Authenticated(session) => Ok(session),
        _ => Err(AppError::Unauthenticated),
    }
}

/// Any signed-in caller.
pub struct AuthSession(pub Session);

/// Signed-in caller whose effective role is student.
pub struct StudentSession(pub Session);

/// Signed-in caller whose effective role is admin.
pub struct AdminSession(pub Session);

#[async_trait]
impl FromRequestParts<AppState> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        require(parts, state, None).await.map(AuthSession)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for StudentSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        require(parts, state, Some(Role::Student)).await.map(StudentSession)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        require(parts, state, Some(Role::Admin)).await.map(AdminSession)
    }
}
