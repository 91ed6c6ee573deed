use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{
        InitiatePaymentRequest, InitiatePaymentResponse, LevelsResponse, PaymentView,
        ProofUrlResponse, ReceiptQuery,
    },
    pricing::levels,
    repo_types::{PaymentRecord, PaymentWithPayer},
    services,
};
use crate::{
    auth::extractors::{AdminSession, AuthSession, StudentSession},
    db::{Page, Pagination},
    error::AppResult,
    images::services::{read_file_field, UPLOAD_BODY_LIMIT},
    receipts,
    state::AppState,
};

pub fn student_routes() -> Router<AppState> {
    Router::new()
        .route("/payments/levels", get(list_levels))
        .route("/payments", get(my_payments).post(initiate_payment))
        .route("/payments/:reference/confirm", post(confirm_payment))
        .route(
            "/payments/:reference/proof",
            get(proof_url).post(upload_proof),
        )
        .route("/payments/:reference/receipt", get(receipt))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/payments", get(list_payments))
        .route("/admin/payments/:reference/approve", post(approve_payment))
}

pub async fn list_levels() -> Json<LevelsResponse> {
    Json(LevelsResponse::new(levels()))
}

#[instrument(skip(state, session))]
pub async fn my_payments(
    State(state): State<AppState>,
    StudentSession(session): StudentSession,
) -> AppResult<Json<Vec<PaymentView>>> {
    let payments = services::history(&state, &session.user_id).await?;
    Ok(Json(payments.into_iter().map(PaymentView::from).collect()))
}

#[instrument(skip(state, session, body))]
pub async fn initiate_payment(
    State(state): State<AppState>,
    StudentSession(session): StudentSession,
    Json(body): Json<InitiatePaymentRequest>,
) -> AppResult<(StatusCode, Json<InitiatePaymentResponse>)> {
    let (payment, checkout) = services::initiate(&state, &session, &body.level).await?;
    Ok((
        StatusCode::CREATED,
        Json(InitiatePaymentResponse { payment, checkout }),
    ))
}

#[instrument(skip(state, session))]
pub async fn confirm_payment(
    State(state): State<AppState>,
    StudentSession(session): StudentSession,
    Path(reference): Path<String>,
) -> AppResult<Json<PaymentRecord>> {
    Ok(Json(services::confirm(&state, &session, &reference).await?))
}

#[instrument(skip(state, session, mp))]
pub async fn upload_proof(
    State(state): State<AppState>,
    StudentSession(session): StudentSession,
    Path(reference): Path<String>,
    mut mp: Multipart,
) -> AppResult<Json<PaymentRecord>> {
    let item = read_file_field(&mut mp, "file").await?;
    Ok(Json(
        services::attach_proof(&state, &session, &reference, item).await?,
    ))
}

#[instrument(skip(state, session))]
pub async fn proof_url(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(reference): Path<String>,
) -> AppResult<Json<ProofUrlResponse>> {
    let url = services::proof_url(&state, &session, &reference).await?;
    Ok(Json(ProofUrlResponse { url }))
}

#[instrument(skip(state, session))]
pub async fn receipt(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(reference): Path<String>,
    Query(q): Query<ReceiptQuery>,
) -> AppResult<Html<String>> {
    let html = receipts::receipt_for(&state, &session, &reference, q.kind).await?;
    Ok(Html(html))
}

#[instrument(skip(state, _admin))]
pub async fn list_payments(
    State(state): State<AppState>,
    _admin: AdminSession,
    Query(page): Query<Pagination>,
) -> AppResult<Json<Page<PaymentWithPayer>>> {
    Ok(Json(services::list_all(&state, page).await?))
}

#[instrument(skip(state, admin))]
pub async fn approve_payment(
    State(state): State<AppState>,
    AdminSession(admin): AdminSession,
    Path(reference): Path<String>,
) -> AppResult<Json<PaymentRecord>> {
    Ok(Json(
        services::approve(&state, &admin.user_id, &reference).await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        payments::repo_types::PaymentStatus,
        testing::{body_json, Fakes, MemoryStore},
    };
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    fn app(fakes: &Fakes) -> Router {
        Router::new()
            .merge(student_routes())
            .merge(admin_routes())
            .with_state(fakes.state())
    }

    fn post_json(uri: &str, token: &str, json: &str) -> Request<Body> {
        Request::post(uri)
            .header("authorization", format!("Bearer {token}"))
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn levels_are_public() {
        let fakes = Fakes::new();
        let res = app(&fakes)
            .oneshot(Request::get("/payments/levels").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = body_json(res).await;
        assert_eq!(json["currency"], "NGN");
        assert_eq!(json["levels"][0]["level"], "100");
    }

    #[tokio::test]
    async fn student_initiates_and_confirms() {
        let fakes = Fakes::new();
        let token = fakes.sign_in_as("u1", "Ada", Some("student"));

        let res = app(&fakes)
            .oneshot(post_json("/payments", &token, r#"{"level":"200"}"#))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let json = body_json(res).await;
        assert_eq!(json["checkout"]["amount"], 300_000);
        assert_eq!(json["payment"]["status"], "Pending");
        let reference = json["checkout"]["reference"].as_str().unwrap().to_string();

        let res = app(&fakes)
            .oneshot(post_json(&format!("/payments/{reference}/confirm"), &token, ""))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["status"], "Verified-Pending-Approval");
    }

    #[tokio::test]
    async fn admins_cannot_use_student_routes() {
        let fakes = Fakes::new();
        let token = fakes.sign_in_as("a1", "Admin", Some("admin"));
        let res = app(&fakes)
            .oneshot(post_json("/payments", &token, r#"{"level":"200"}"#))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn approval_requires_admin_and_is_single_shot() {
        let fakes = Fakes::new();
        fakes.store.insert_payment(MemoryStore::payment(
            "ref-v",
            "u1",
            PaymentStatus::VerifiedPendingApproval,
        ));
        let student = fakes.sign_in_as("u1", "Ada", Some("student"));
        let admin = fakes.sign_in_as("a1", "Admin", Some("Admin"));

        let res = app(&fakes)
            .oneshot(post_json("/admin/payments/ref-v/approve", &student, ""))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let res = app(&fakes)
            .oneshot(post_json("/admin/payments/ref-v/approve", &admin, ""))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["status"], "Approved");

        let res = app(&fakes)
            .oneshot(post_json("/admin/payments/ref-v/approve", &admin, ""))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn unauthenticated_api_calls_get_401() {
        let fakes = Fakes::new();
        let res = app(&fakes)
            .oneshot(Request::get("/admin/payments").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn receipt_for_other_students_payment_is_forbidden() {
        let fakes = Fakes::new();
        fakes
            .store
            .insert_payment(MemoryStore::payment("ref-o", "u2", PaymentStatus::Approved));
        let token = fakes.sign_in_as("u1", "Ada", Some("student"));
        let res = app(&fakes)
            .oneshot(
                Request::get("/payments/ref-o/receipt")
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn official_receipt_for_pending_is_conflict() {
        let fakes = Fakes::new();
        fakes
            .store
            .insert_payment(MemoryStore::payment("ref-p", "u1", PaymentStatus::Pending));
        let token = fakes.sign_in_as("u1", "Ada", Some("student"));
        let res = app(&fakes)
            .oneshot(
                Request::get("/payments/ref-p/receipt?kind=official")
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }
}
