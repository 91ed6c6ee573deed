//! Server-rendered pages. Every guarded route goes through the page guard,
//! which resolves the session once and hands it to the handler.

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use crate::{images::services::UPLOAD_BODY_LIMIT, state::AppState};

pub mod admin;
pub mod documents;
pub mod guard;
pub mod public;
pub mod student;
pub mod views;

pub fn router(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(public::home))
        .route("/login", get(public::login_page).post(public::login_submit))
        .route(
            "/register",
            get(public::register_page).post(public::register_submit),
        )
        .route("/logout", post(public::logout))
        .route("/unauthorized", get(public::unauthorized));

    let student = Router::new()
        .route("/dashboard", get(student::dashboard))
        .route("/dashboard/payments", post(student::start_payment))
        .route(
            "/dashboard/payments/:reference/confirm",
            post(student::confirm_payment),
        )
        .route(
            "/dashboard/payments/:reference/proof",
            post(student::upload_proof),
        )
        .route(
            "/dashboard/profile",
            get(student::profile).post(student::update_profile),
        )
        .route("/dashboard/profile/photo", post(student::upload_photo))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
        .route_layer(from_fn_with_state(state.clone(), guard::require_student));

    let admin = Router::new()
        .route("/admin", get(admin::overview))
        .route("/admin/students", get(admin::students))
        .route("/admin/payments", get(admin::payments))
        .route("/admin/payments/:reference/approve", post(admin::approve))
        .route("/admin/settings", get(admin::settings))
        .route_layer(from_fn_with_state(state.clone(), guard::require_admin));

    let documents = Router::new()
        .route("/receipts/:reference", get(documents::receipt))
        .route("/proofs/:reference", get(documents::proof))
        .route_layer(from_fn_with_state(state.clone(), guard::require_session));

    public.merge(student).merge(admin).merge(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        payments::repo_types::PaymentStatus,
        testing::{body_string, Fakes, MemoryStore},
    };
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use std::time::Duration;
    use tower::ServiceExt;

    async fn send(fakes: &Fakes, req: Request<Body>) -> Response {
        let state = fakes.state();
        router(&state).with_state(state).oneshot(req).await.unwrap()
    }

    fn get_with_cookie(uri: &str, token: &str) -> Request<Body> {
        Request::get(uri)
            .header(header::COOKIE, format!("dues_session={token}"))
            .body(Body::empty())
            .unwrap()
    }

    fn post_form(uri: &str, token: Option<&str>, form: &str) -> Request<Body> {
        let mut req = Request::post(uri).header(
            header::CONTENT_TYPE,
            "application/x-www-form-urlencoded",
        );
        if let Some(token) = token {
            req = req.header(header::COOKIE, format!("dues_session={token}"));
        }
        req.body(Body::from(form.to_string())).unwrap()
    }

    fn location(res: &Response) -> &str {
        res.headers()[header::LOCATION].to_str().unwrap()
    }

    #[tokio::test]
    async fn anonymous_admin_visit_redirects_to_login() {
        let fakes = Fakes::new();
        let res = send(&fakes, Request::get("/admin").body(Body::empty()).unwrap()).await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&res), "/login");
    }

    #[tokio::test]
    async fn role_mismatch_redirects_to_unauthorized() {
        let fakes = Fakes::new();
        let student = fakes.sign_in_as("u1", "Ada", Some("student"));
        let res = send(&fakes, get_with_cookie("/admin/payments", &student)).await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&res), "/unauthorized");

        let admin = fakes.sign_in_as("a1", "Admin", Some("admin"));
        let res = send(&fakes, get_with_cookie("/dashboard", &admin)).await;
        assert_eq!(location(&res), "/unauthorized");
    }

    #[tokio::test]
    async fn slow_profile_read_shows_loading_page() {
        let fakes = Fakes::new();
        let token = fakes.sign_in_as("u1", "Ada", Some("student"));
        fakes.store.set_read_delay(Duration::from_secs(2));
        let res = send(&fakes, get_with_cookie("/dashboard", &token)).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::REFRESH], "1");
        assert!(body_string(res).await.contains("Loading..."));
    }

    #[tokio::test]
    async fn login_form_sets_cookie_and_redirects_by_role() {
        let fakes = Fakes::new();
        fakes.identity.add_account("a1", "2019000001@cs.unn.edu.ng", "secret1");
        fakes.store.insert_profile(MemoryStore::profile("a1", "Admin", Some("admin")));

        let res = send(
            &fakes,
            post_form("/login", None, "reg_no=2019%2F000001&password=secret1&remember=on"),
        )
        .await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&res), "/admin");
        let cookie = res.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.contains("Max-Age="));
    }

    #[tokio::test]
    async fn login_errors_render_inline() {
        let fakes = Fakes::new();
        let res = send(&fakes, post_form("/login", None, "reg_no=2019&password=secret1")).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let html = body_string(res).await;
        assert!(html.contains("Invalid registration number format"));
        assert_eq!(fakes.identity.calls(), 0);
    }

    #[tokio::test]
    async fn register_form_redirects_to_login() {
        let fakes = Fakes::new();
        let res = send(
            &fakes,
            post_form(
                "/register",
                None,
                "name=Ada+Obi&reg_no=2020241762&password=secret1&confirm_password=secret1",
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&res), "/login?registered=1");
    }

    #[tokio::test]
    async fn student_starts_payment_from_dashboard() {
        let fakes = Fakes::new();
        let token = fakes.sign_in_as("u1", "Ada Obi", Some("student"));

        let res = send(&fakes, post_form("/dashboard/payments", Some(&token), "level=200")).await;
        assert_eq!(res.status(), StatusCode::OK);
        let html = body_string(res).await;
        assert!(html.contains("Complete your payment"));
        assert!(html.contains("ref-u1-"));

        let res = send(&fakes, get_with_cookie("/dashboard", &token)).await;
        let html = body_string(res).await;
        assert!(html.contains("Ada Obi"));
        assert!(html.contains("₦ 3,000"));
    }

    #[tokio::test]
    async fn unknown_level_shows_banner() {
        let fakes = Fakes::new();
        let token = fakes.sign_in_as("u1", "Ada", Some("student"));
        let res = send(&fakes, post_form("/dashboard/payments", Some(&token), "level=900")).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(res).await.contains("Please select a valid level"));
    }

    #[tokio::test]
    async fn admin_approves_from_payments_page() {
        let fakes = Fakes::new();
        fakes.store.insert_profile(MemoryStore::profile("u1", "Ada", Some("student")));
        fakes.store.insert_payment(MemoryStore::payment(
            "ref-v",
            "u1",
            PaymentStatus::VerifiedPendingApproval,
        ));
        let admin = fakes.sign_in_as("a1", "Admin", Some("admin"));

        let res = send(&fakes, get_with_cookie("/admin/payments", &admin)).await;
        assert!(body_string(res).await.contains("/admin/payments/ref-v/approve"));

        let res = send(&fakes, post_form("/admin/payments/ref-v/approve", Some(&admin), "")).await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            fakes.store.stored_payment("ref-v").unwrap().status,
            PaymentStatus::Approved
        );
    }

    #[tokio::test]
    async fn admin_overview_and_settings_render() {
        let fakes = Fakes::new();
        let admin = fakes.sign_in_as("a1", "Admin", Some("admin"));
        let res = send(&fakes, get_with_cookie("/admin", &admin)).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(body_string(res).await.contains("Approval Rate"));

        let res = send(&fakes, get_with_cookie("/admin/settings", &admin)).await;
        assert!(body_string(res).await.contains("cs.unn.edu.ng"));
    }

    #[tokio::test]
    async fn receipt_page_uses_cookie_session() {
        let fakes = Fakes::new();
        fakes
            .store
            .insert_payment(MemoryStore::payment("ref-a", "u1", PaymentStatus::Approved));
        let token = fakes.sign_in_as("u1", "Ada", Some("student"));
        let res = send(&fakes, get_with_cookie("/receipts/ref-a", &token)).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(body_string(res).await.contains("Official Payment Receipt"));
    }

    #[tokio::test]
    async fn logout_clears_cookie() {
        let fakes = Fakes::new();
        let res = send(&fakes, post_form("/logout", None, "")).await;
        assert_eq!(location(&res), "/login");
        assert!(res.headers()[header::SET_COOKIE]
            .to_str()
            .unwrap()
            .contains("Max-Age=0"));
    }
}
