use axum::{
    extract::{Multipart, Path, State},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use tracing::instrument;

use super::{
    guard::{render, PageResult},
    views::{Banner, NavUser, PaymentLine, ProfilePage, StudentDashboardPage},
};
use crate::{
    auth::extractors::StudentSession,
    error::{AppError, AppResult},
    images::services::read_file_field,
    payments::{
        pricing::levels,
        repo_types::MISSING_FIELD,
        services::{self as payments, CheckoutConfig},
    },
    profiles::{
        repo_types::{ProfileUpdate, UserProfile},
        services as profiles,
    },
    session::Session,
    state::AppState,
};

const DASHBOARD: &str = "/dashboard";
const PROFILE: &str = "/dashboard/profile";

async fn dashboard_view(
    st: &AppState,
    session: &Session,
    checkout: Option<CheckoutConfig>,
    banner: Option<Banner>,
) -> PageResult<Html<String>> {
    let history = payments::history(st, &session.user_id).await?;
    let profile = session.profile.as_ref();
    render(StudentDashboardPage {
        nav: Some(NavUser::from_session(session)),
        banner,
        name: profile
            .map(|p| p.name.clone())
            .unwrap_or_else(|| session.email.clone()),
        reg_no: profile
            .map(|p| p.reg_no.clone())
            .unwrap_or_else(|| MISSING_FIELD.to_string()),
        level: profile
            .and_then(|p| p.level.clone())
            .unwrap_or_default(),
        levels: levels(),
        payments: history.iter().map(PaymentLine::own).collect(),
        checkout,
        gateway: st.gateway.name(),
    })
}

/// Redirects back on success; otherwise re-renders the dashboard with a banner.
async fn after_action(
    st: &AppState,
    session: &Session,
    outcome: AppResult<()>,
) -> PageResult<Response> {
    match outcome {
        Ok(()) => Ok(Redirect::to(DASHBOARD).into_response()),
        Err(e) => {
            e.log();
            let status = e.status_code();
            let page = dashboard_view(st, session, None, Some(Banner::error(e.user_message()))).await?;
            Ok((status, page).into_response())
        }
    }
}

pub async fn dashboard(
    State(state): State<AppState>,
    StudentSession(session): StudentSession,
) -> PageResult<Html<String>> {
    dashboard_view(&state, &session, None, None).await
}

#[derive(Debug, Deserialize)]
pub struct PaymentForm {
    pub level: String,
}

#[instrument(skip(state, session, form))]
pub async fn start_payment(
    State(state): State<AppState>,
    StudentSession(session): StudentSession,
    Form(form): Form<PaymentForm>,
) -> PageResult<Response> {
    match payments::initiate(&state, &session, &form.level).await {
        Ok((_, checkout)) => Ok(dashboard_view(&state, &session, Some(checkout), None)
            .await?
            .into_response()),
        Err(e) => after_action(&state, &session, Err(e)).await,
    }
}

#[instrument(skip(state, session))]
pub async fn confirm_payment(
    State(state): State<AppState>,
    StudentSession(session): StudentSession,
    Path(reference): Path<String>,
) -> PageResult<Response> {
    let outcome = payments::confirm(&state, &session, &reference).await.map(|_| ());
    after_action(&state, &session, outcome).await
}

#[instrument(skip(state, session, mp))]
pub async fn upload_proof(
    State(state): State<AppState>,
    StudentSession(session): StudentSession,
    Path(reference): Path<String>,
    mut mp: Multipart,
) -> PageResult<Response> {
    let outcome = match read_file_field(&mut mp, "file").await {
        Ok(item) => payments::attach_proof(&state, &session, &reference, item)
            .await
            .map(|_| ()),
        Err(e) => Err(e),
    };
    after_action(&state, &session, outcome).await
}

async fn own_profile(st: &AppState, session: &Session) -> AppResult<UserProfile> {
    st.profiles
        .get(&session.user_id)
        .await?
        .ok_or(AppError::ProfileMissing)
}

async fn profile_view(
    st: &AppState,
    session: &Session,
    banner: Option<Banner>,
) -> PageResult<Html<String>> {
    let profile = own_profile(st, session).await?;
    render(ProfilePage {
        nav: Some(NavUser::from_session(session)),
        banner,
        level: profile.level.clone().unwrap_or_default(),
        profile,
        levels: levels(),
    })
}

async fn after_profile_action(
    st: &AppState,
    session: &Session,
    outcome: AppResult<()>,
) -> PageResult<Response> {
    match outcome {
        Ok(()) => Ok(Redirect::to(PROFILE).into_response()),
        Err(e) => {
            e.log();
            let status = e.status_code();
            let page = profile_view(st, session, Some(Banner::error(e.user_message()))).await?;
            Ok((status, page).into_response())
        }
    }
}

pub async fn profile(
    State(state): State<AppState>,
    StudentSession(session): StudentSession,
) -> PageResult<Html<String>> {
    profile_view(&state, &session, None).await
}

#[instrument(skip(state, session, form))]
pub async fn update_profile(
    State(state): State<AppState>,
    StudentSession(session): StudentSession,
    Form(form): Form<ProfileUpdate>,
) -> PageResult<Response> {
    let outcome = profiles::update_profile(&state, &session, form)
        .await
        .map(|_| ());
    after_profile_action(&state, &session, outcome).await
}

#[instrument(skip(state, session, mp))]
pub async fn upload_photo(
    State(state): State<AppState>,
    StudentSession(session): StudentSession,
    mut mp: Multipart,
) -> PageResult<Response> {
    let outcome = match read_file_field(&mut mp, "file").await {
        Ok(item) => profiles::upload_photo(&state, &session, item).await.map(|_| ()),
        Err(e) => Err(e),
    };
    after_profile_action(&state, &session, outcome).await
}
