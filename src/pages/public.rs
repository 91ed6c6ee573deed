use axum::{
    extract::{Query, State},
    http::header,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use tracing::instrument;

use super::{
    guard::{render, PageResult},
    views::{Banner, HomePage, LoginPage, NavUser, RegisterPage, UnauthorizedPage},
};
use crate::{
    auth::{
        dto::{LoginRequest, RegisterRequest},
        extractors::{clear_session_cookie, session_cookie, CurrentSession},
        handlers::cookie_max_age,
        services,
    },
    session::SessionState,
    state::AppState,
};

fn nav_for(state: &SessionState) -> Option<NavUser> {
    match state {
        SessionState::Authenticated(session) => Some(NavUser::from_session(session)),
        _ => None,
    }
}

pub async fn home(CurrentSession(session): CurrentSession) -> PageResult<impl IntoResponse> {
    render(HomePage {
        nav: nav_for(&session),
        banner: None,
    })
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub registered: Option<String>,
}

pub async fn login_page(Query(q): Query<LoginQuery>) -> PageResult<impl IntoResponse> {
    render(LoginPage {
        nav: None,
        banner: q.registered.map(|_| Banner {
            kind: "info",
            message: "Registration successful. Please log in.".into(),
        }),
        reg_no: String::new(),
        error: None,
    })
}

/// HTML checkboxes post `on` or nothing.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub reg_no: String,
    pub password: String,
    pub remember: Option<String>,
}

#[instrument(skip(state, form))]
pub async fn login_submit(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> PageResult<Response> {
    let req = LoginRequest {
        reg_no: form.reg_no,
        password: form.password,
        remember: form.remember.is_some(),
    };
    match services::login(&state, &req).await {
        Ok(signed_in) => {
            let cookie = session_cookie(
                &signed_in.tokens.access_token,
                req.remember,
                cookie_max_age(&state),
            );
            Ok((
                AppendHeaders([(header::SET_COOKIE, cookie)]),
                Redirect::to(signed_in.redirect),
            )
                .into_response())
        }
        Err(e) => {
            e.log();
            let page = render(LoginPage {
                nav: None,
                banner: None,
                reg_no: req.reg_no,
                error: Some(e.user_message()),
            })?;
            Ok((e.status_code(), page).into_response())
        }
    }
}

pub async fn register_page() -> PageResult<impl IntoResponse> {
    render(RegisterPage {
        nav: None,
        banner: None,
        name: String::new(),
        reg_no: String::new(),
        error: None,
    })
}

#[instrument(skip(state, form))]
pub async fn register_submit(
    State(state): State<AppState>,
    Form(form): Form<RegisterRequest>,
) -> PageResult<Response> {
    let (name, reg_no) = (form.name.clone(), form.reg_no.clone());
    match services::register(&state, form).await {
        Ok(_) => Ok(Redirect::to("/login?registered=1").into_response()),
        Err(e) => {
            e.log();
            let page = render(RegisterPage {
                nav: None,
                banner: None,
                name,
                reg_no,
                error: Some(e.user_message()),
            })?;
            Ok((e.status_code(), page).into_response())
        }
    }
}

pub async fn logout() -> impl IntoResponse {
    (
        AppendHeaders([(header::SET_COOKIE, clear_session_cookie())]),
        Redirect::to("/login"),
    )
}

pub async fn unauthorized(CurrentSession(session): CurrentSession) -> PageResult<impl IntoResponse> {
    render(UnauthorizedPage {
        nav: nav_for(&session),
        banner: None,
    })
}
