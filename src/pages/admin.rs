use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use tracing::instrument;

use super::{
    guard::{render, PageResult},
    views::{
        AdminOverviewPage, AdminPaymentsPage, AdminSettingsPage, AdminStudentsPage, Banner,
        NavUser, PaymentLine,
    },
};
use crate::{
    auth::extractors::AdminSession,
    dashboard::handlers::{load_summary, SettingsView},
    db::Pagination,
    payments::services as payment_services,
    profiles::{dto::StudentQuery, services as profiles},
    receipts::format_naira,
    session::Session,
    state::AppState,
};

pub async fn overview(
    State(state): State<AppState>,
    AdminSession(admin): AdminSession,
) -> PageResult<Html<String>> {
    let summary = load_summary(&state).await?;
    render(AdminOverviewPage {
        nav: Some(NavUser::from_session(&admin)),
        banner: None,
        total_amount: format_naira(summary.total_amount),
        recent: summary.recent.iter().map(PaymentLine::with_payer).collect(),
        summary,
    })
}

pub async fn students(
    State(state): State<AppState>,
    AdminSession(admin): AdminSession,
    Query(q): Query<StudentQuery>,
) -> PageResult<Html<String>> {
    let page = profiles::list_students(&state, q.q.as_deref(), q.page()).await?;
    render(AdminStudentsPage {
        nav: Some(NavUser::from_session(&admin)),
        banner: None,
        q: q.q.unwrap_or_default(),
        page,
    })
}

async fn payments_view(
    st: &AppState,
    admin: &Session,
    page: Pagination,
    banner: Option<Banner>,
) -> PageResult<Html<String>> {
    let page = payment_services::list_all(st, page).await?;
    render(AdminPaymentsPage {
        nav: Some(NavUser::from_session(admin)),
        banner,
        total: page.total,
        lines: page.items.iter().map(PaymentLine::with_payer).collect(),
        prev_offset: page.has_prev().then(|| page.prev_offset()),
        next_offset: page.has_next().then(|| page.next_offset()),
    })
}

pub async fn payments(
    State(state): State<AppState>,
    AdminSession(admin): AdminSession,
    Query(page): Query<Pagination>,
) -> PageResult<Html<String>> {
    payments_view(&state, &admin, page, None).await
}

#[instrument(skip(state, admin))]
pub async fn approve(
    State(state): State<AppState>,
    AdminSession(admin): AdminSession,
    Path(reference): Path<String>,
) -> PageResult<Response> {
    match payment_services::approve(&state, &admin.user_id, &reference).await {
        Ok(_) => Ok(Redirect::to("/admin/payments").into_response()),
        Err(e) => {
            e.log();
            let status = e.status_code();
            let page = payments_view(
                &state,
                &admin,
                Pagination::default(),
                Some(Banner::error(e.user_message())),
            )
            .await?;
            Ok((status, page).into_response())
        }
    }
}

pub async fn settings(
    State(state): State<AppState>,
    AdminSession(admin): AdminSession,
) -> PageResult<Html<String>> {
    render(AdminSettingsPage {
        nav: Some(NavUser::from_session(&admin)),
        banner: None,
        settings: SettingsView::from_state(&state),
    })
}
