pub mod dto;
pub mod gateway;
pub mod handlers;
pub mod pricing;
pub mod reconcile;
pub mod repo;
pub mod repo_types;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::student_routes())
        .merge(handlers::admin_routes())
}
