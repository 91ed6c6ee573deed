use axum::{
    extract::{Path, Query, State},
    response::{Html, Redirect},
};

use super::guard::PageResult;
use crate::{
    auth::extractors::AuthSession, payments::dto::ReceiptQuery, payments::services, receipts,
    state::AppState,
};

/// Printable receipt for the owner or an admin.
pub async fn receipt(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(reference): Path<String>,
    Query(q): Query<ReceiptQuery>,
) -> PageResult<Html<String>> {
    let html = receipts::receipt_for(&state, &session, &reference, q.kind).await?;
    Ok(Html(html))
}

/// Sends the browser to a short-lived link for the uploaded proof.
pub async fn proof(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(reference): Path<String>,
) -> PageResult<Redirect> {
    let url = services::proof_url(&state, &session, &reference).await?;
    Ok(Redirect::to(&url))
}
