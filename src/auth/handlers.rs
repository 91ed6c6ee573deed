use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{AppendHeaders, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{AuthResponse, LoginRequest, MeResponse, PublicUser, RefreshRequest, RegisterRequest, TokenPair},
    extractors::{clear_session_cookie, session_cookie, AuthSession},
    services,
};
use crate::{error::AppResult, state::AppState};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

/// Cookie lifetime for "remember me", matching the access token.
pub fn cookie_max_age(state: &AppState) -> u64 {
    state.config.jwt.ttl_minutes as u64 * 60
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<PublicUser>)> {
    let profile = services::register(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(profile.into())))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let signed_in = services::login(&state, &payload).await?;
    let cookie = session_cookie(
        &signed_in.tokens.access_token,
        payload.remember,
        cookie_max_age(&state),
    );
    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(AuthResponse {
            tokens: signed_in.tokens,
            redirect: signed_in.redirect,
            user: signed_in.profile.into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<Json<TokenPair>> {
    Ok(Json(services::refresh(&state, &payload)?))
}

pub async fn logout() -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        AppendHeaders([(header::SET_COOKIE, clear_session_cookie())]),
    )
}

#[instrument(skip(session))]
pub async fn get_me(AuthSession(session): AuthSession) -> Json<MeResponse> {
    Json(session.into())
}
