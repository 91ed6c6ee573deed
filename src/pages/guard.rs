use anyhow::Context;
use askama::Template;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
};
use tracing::debug;

use super::views::{ErrorPage, LoadingPage};
use crate::{
    auth::extractors::session_for,
    error::AppError,
    session::{
        guard::{decide, GuardDecision},
        Role,
    },
    state::AppState,
};

/// Seconds before the loading page asks the browser to try again.
const REFRESH_AFTER: &str = "1";

async fn enforce(required: Option<Role>, state: &AppState, mut req: Request, next: Next) -> Response {
    let session = session_for(req.headers(), state).await;
    match decide(&session, required) {
        GuardDecision::Render => {
            req.extensions_mut().insert(session);
            next.run(req).await
        }
        GuardDecision::Placeholder => loading_page(),
        GuardDecision::Redirect(to) => {
            debug!(path = %req.uri().path(), to, "page guard redirect");
            Redirect::to(to).into_response()
        }
    }
}

pub async fn require_session(State(state): State<AppState>, req: Request, next: Next) -> Response {
    enforce(None, &state, req, next).await
}

pub async fn require_student(State(state): State<AppState>, req: Request, next: Next) -> Response {
    enforce(Some(Role::Student), &state, req, next).await
}

pub async fn require_admin(State(state): State<AppState>, req: Request, next: Next) -> Response {
    enforce(Some(Role::Admin), &state, req, next).await
}

fn loading_page() -> Response {
    match (LoadingPage { nav: None, banner: None }).render() {
        Ok(html) => ([(header::REFRESH, REFRESH_AFTER)], Html(html)).into_response(),
        Err(e) => PageError(AppError::Internal(e.into())).into_response(),
    }
}

/// Renders a template, turning failures into a page error.
pub fn render<T: Template>(page: T) -> Result<Html<String>, PageError> {
    let html = page.render().context("render page").map_err(AppError::from)?;
    Ok(Html(html))
}

/// `AppError` shown as an HTML page instead of JSON.
#[derive(Debug)]
pub struct PageError(pub AppError);

impl From<AppError> for PageError {
    fn from(e: AppError) -> Self {
        PageError(e)
    }
}

pub type PageResult<T> = Result<T, PageError>;

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let err = self.0;
        err.log();
        let status = err.status_code();
        let page = ErrorPage {
            nav: None,
            banner: None,
            status: status.as_u16(),
            message: err.user_message(),
        };
        match page.render() {
            Ok(html) => (status, Html(html)).into_response(),
            Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, err.user_message()).into_response(),
        }
    }
}
