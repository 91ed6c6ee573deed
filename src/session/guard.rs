use super::{Role, SessionState};
use crate::error::AppError;

pub const LOGIN_PATH: &str = "/login";
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Render,
    /// Session not settled yet; show the interim page.
    Placeholder,
    Redirect(&'static str),
}

/// Pure access decision, recomputed on every request.
pub fn decide(state: &SessionState, required: Option<Role>) -> GuardDecision {
    match state {
        SessionState::Resolving => GuardDecision::Placeholder,
        SessionState::Unauthenticated => GuardDecision::Redirect(LOGIN_PATH),
        SessionState::Authenticated(session) => match required {
            None => GuardDecision::Render,
            Some(role) if session.effective_role() == Some(role) => GuardDecision::Render,
            Some(_) => GuardDecision::Redirect(UNAUTHORIZED_PATH),
        },
    }
}

/// Same decision, expressed for the JSON surface.
pub fn check(state: &SessionState, required: Option<Role>) -> Result<(), AppError> {
    match decide(state, required) {
        GuardDecision::Render => Ok(()),
        GuardDecision::Placeholder => Err(AppError::SessionResolving),
        GuardDecision::Redirect(LOGIN_PATH) => Err(AppError::Unauthenticated),
        GuardDecision::Redirect(_) => Err(AppError::Forbidden),
    }
}
