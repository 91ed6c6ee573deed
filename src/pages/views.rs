//! Template contexts. Rows carry display-ready strings so templates stay
//! free of formatting logic.

use askama::Template;

use crate::{
    dashboard::{aggregate::DashboardSummary, handlers::SettingsView},
    db::Page,
    payments::{
        pricing::LevelPrice,
        repo_types::{PaymentRecord, PaymentStatus, PaymentWithPayer},
        services::CheckoutConfig,
    },
    profiles::repo_types::UserProfile,
    receipts::{format_date, format_naira, offered},
    session::Session,
};

/// Signed-in user shown in the navigation bar.
pub struct NavUser {
    pub name: String,
    pub is_admin: bool,
}

impl NavUser {
    pub fn from_session(session: &Session) -> Self {
        Self {
            name: session
                .profile
                .as_ref()
                .map(|p| p.name.clone())
                .unwrap_or_else(|| session.email.clone()),
            is_admin: session.is_admin(),
        }
    }
}

pub struct Banner {
    pub kind: &'static str,
    pub message: String,
}

impl Banner {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: "error",
            message: message.into(),
        }
    }
}

pub struct PaymentLine {
    pub reference: String,
    pub name: String,
    pub reg_no: String,
    pub department: String,
    pub level: String,
    pub amount: String,
    pub badge: &'static str,
    pub badge_class: &'static str,
    pub submitted: String,
    pub receipt: Option<&'static str>,
    pub has_proof: bool,
    pub can_confirm: bool,
    pub can_approve: bool,
}

impl PaymentLine {
    pub fn own(p: &PaymentRecord) -> Self {
        Self::build(p, String::new(), String::new(), String::new())
    }

    pub fn with_payer(p: &PaymentWithPayer) -> Self {
        Self::build(
            &p.payment,
            p.name.clone(),
            p.reg_no.clone(),
            p.department.clone(),
        )
    }

    fn build(p: &PaymentRecord, name: String, reg_no: String, department: String) -> Self {
        Self {
            reference: p.id.clone(),
            name,
            reg_no,
            department,
            level: p.level.clone(),
            amount: format_naira(p.amount),
            badge: p.status.badge(),
            badge_class: match p.status {
                PaymentStatus::Approved => "ok",
                PaymentStatus::Rejected => "bad",
                _ => "wait",
            },
            submitted: format_date(p.submitted_at),
            receipt: offered(p.status).map(|k| k.as_str()),
            has_proof: p.proof_key.is_some(),
            can_confirm: p.status == PaymentStatus::Pending,
            can_approve: p.status == PaymentStatus::VerifiedPendingApproval,
        }
    }
}

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomePage {
    pub nav: Option<NavUser>,
    pub banner: Option<Banner>,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginPage {
    pub nav: Option<NavUser>,
    pub banner: Option<Banner>,
    pub reg_no: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterPage {
    pub nav: Option<NavUser>,
    pub banner: Option<Banner>,
    pub name: String,
    pub reg_no: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "unauthorized.html")]
pub struct UnauthorizedPage {
    pub nav: Option<NavUser>,
    pub banner: Option<Banner>,
}

/// Interim page while the session is still resolving.
#[derive(Template)]
#[template(path = "loading.html")]
pub struct LoadingPage {
    pub nav: Option<NavUser>,
    pub banner: Option<Banner>,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorPage {
    pub nav: Option<NavUser>,
    pub banner: Option<Banner>,
    pub status: u16,
    pub message: String,
}

#[derive(Template)]
#[template(path = "dashboard/home.html")]
pub struct StudentDashboardPage {
    pub nav: Option<NavUser>,
    pub banner: Option<Banner>,
    pub name: String,
    pub reg_no: String,
    pub level: String,
    pub levels: Vec<LevelPrice>,
    pub payments: Vec<PaymentLine>,
    pub checkout: Option<CheckoutConfig>,
    pub gateway: &'static str,
}

#[derive(Template)]
#[template(path = "dashboard/profile.html")]
pub struct ProfilePage {
    pub nav: Option<NavUser>,
    pub banner: Option<Banner>,
    pub profile: UserProfile,
    pub level: String,
    pub levels: Vec<LevelPrice>,
}

#[derive(Template)]
#[template(path = "admin/overview.html")]
pub struct AdminOverviewPage {
    pub nav: Option<NavUser>,
    pub banner: Option<Banner>,
    pub summary: DashboardSummary,
    pub total_amount: String,
    pub recent: Vec<PaymentLine>,
}

#[derive(Template)]
#[template(path = "admin/students.html")]
pub struct AdminStudentsPage {
    pub nav: Option<NavUser>,
    pub banner: Option<Banner>,
    pub q: String,
    pub page: Page<UserProfile>,
}

#[derive(Template)]
#[template(path = "admin/payments.html")]
pub struct AdminPaymentsPage {
    pub nav: Option<NavUser>,
    pub banner: Option<Banner>,
    pub total: i64,
    pub lines: Vec<PaymentLine>,
    pub prev_offset: Option<i64>,
    pub next_offset: Option<i64>,
}

#[derive(Template)]
#[template(path = "admin/settings.html")]
pub struct AdminSettingsPage {
    pub nav: Option<NavUser>,
    pub banner: Option<Banner>,
    pub settings: SettingsView,
}
