use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{PhotoResponse, StudentQuery},
    repo_types::{ProfileUpdate, UserProfile},
    services,
};
use crate::{
    auth::extractors::{AdminSession, AuthSession},
    db::Page,
    error::AppResult,
    images::services::{read_file_field, UPLOAD_BODY_LIMIT},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/me/profile", put(update_profile))
        .route(
            "/me/photo",
            post(upload_photo).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/admin/students", get(list_students))
}

#[instrument(skip(state, session, body))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Json(body): Json<ProfileUpdate>,
) -> AppResult<Json<UserProfile>> {
    Ok(Json(services::update_profile(&state, &session, body).await?))
}

#[instrument(skip(state, session, mp))]
pub async fn upload_photo(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    mut mp: Multipart,
) -> AppResult<Json<PhotoResponse>> {
    let item = read_file_field(&mut mp, "file").await?;
    let photo_url = services::upload_photo(&state, &session, item).await?;
    Ok(Json(PhotoResponse { photo_url }))
}

#[instrument(skip(state, _admin))]
pub async fn list_students(
    State(state): State<AppState>,
    _admin: AdminSession,
    Query(q): Query<StudentQuery>,
) -> AppResult<Json<Page<UserProfile>>> {
    let page = services::list_students(&state, q.q.as_deref(), q.page()).await?;
    Ok(Json(page))
}
