use crate::state::AppState;
use axum::Router;

pub mod claims;
pub mod dto;
pub mod extractors;
pub mod firebase;
pub mod handlers;
pub mod identity;
pub mod jwt;
pub mod local;
pub mod password;
pub mod regno;
pub mod services;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::me_routes())
}
