//! Printable receipts, re-rendered from the live record on every request.

use anyhow::Context;
use askama::Template;
use serde::Deserialize;
use time::{macros::format_description, OffsetDateTime};

use crate::{
    error::{AppError, AppResult},
    payments::{
        repo_types::{PaymentRecord, PaymentStatus, MISSING_FIELD},
        services::get_visible,
    },
    profiles::repo_types::UserProfile,
    session::Session,
    state::AppState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptKind {
    Provisional,
    Official,
}

impl ReceiptKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReceiptKind::Provisional => "provisional",
            ReceiptKind::Official => "official",
        }
    }
}

/// The receipt variant a record qualifies for, if any. A `Pending` record is
/// an intent the gateway has not confirmed, so it gets no receipt.
pub fn offered(status: PaymentStatus) -> Option<ReceiptKind> {
    match status {
        PaymentStatus::VerifiedPendingApproval => Some(ReceiptKind::Provisional),
        PaymentStatus::Approved => Some(ReceiptKind::Official),
        PaymentStatus::Pending | PaymentStatus::Rejected => None,
    }
}

/// `3000` -> `₦ 3,000`
pub fn format_naira(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0 { "-" } else { "" };
    format!("₦ {sign}{grouped}")
}

pub fn format_date(at: Option<OffsetDateTime>) -> String {
    let fmt = format_description!("[day] [month repr:short] [year], [hour]:[minute] UTC");
    at.and_then(|t| t.format(fmt).ok())
        .unwrap_or_else(|| MISSING_FIELD.to_string())
}

pub struct ReceiptLines {
    pub reference: String,
    pub name: String,
    pub reg_no: String,
    pub department: String,
    pub level: String,
    pub amount: String,
    pub status: &'static str,
    pub submitted: String,
    pub approved: String,
}

impl ReceiptLines {
    fn new(payment: &PaymentRecord, profile: Option<&UserProfile>) -> Self {
        let field = |value: Option<&String>| {
            value
                .filter(|v| !v.trim().is_empty())
                .cloned()
                .unwrap_or_else(|| MISSING_FIELD.to_string())
        };
        Self {
            reference: payment.id.clone(),
            name: field(profile.map(|p| &p.name)),
            reg_no: field(profile.map(|p| &p.reg_no)),
            department: field(profile.map(|p| &p.department)),
            level: field(Some(&payment.level)),
            amount: format_naira(payment.amount),
            status: payment.status.as_str(),
            submitted: format_date(payment.submitted_at),
            approved: format_date(payment.approved_at),
        }
    }
}

#[derive(Template)]
#[template(path = "receipts/provisional.html")]
struct ProvisionalReceipt {
    r: ReceiptLines,
}

#[derive(Template)]
#[template(path = "receipts/official.html")]
struct OfficialReceipt {
    r: ReceiptLines,
}

pub fn render(
    kind: ReceiptKind,
    payment: &PaymentRecord,
    profile: Option<&UserProfile>,
) -> AppResult<String> {
    if offered(payment.status) != Some(kind) {
        return Err(AppError::Conflict(match kind {
            ReceiptKind::Official => "Official receipts are only issued for approved payments".into(),
            ReceiptKind::Provisional => "No provisional receipt is available for this payment".into(),
        }));
    }

    let r = ReceiptLines::new(payment, profile);
    let html = match kind {
        ReceiptKind::Provisional => ProvisionalReceipt { r }.render(),
        ReceiptKind::Official => OfficialReceipt { r }.render(),
    }
    .context("render receipt")?;
    Ok(html)
}

/// Loads the record and its payer, then renders. Without `kind`, the variant
/// the record qualifies for is used.
pub async fn receipt_for(
    st: &AppState,
    session: &Session,
    reference: &str,
    kind: Option<ReceiptKind>,
) -> AppResult<String> {
    let payment = get_visible(st, session, reference).await?;
    let kind = match kind.or_else(|| offered(payment.status)) {
        Some(kind) => kind,
        None => {
            return Err(AppError::Conflict(
                "No receipt is available until the payment is verified".into(),
            ))
        }
    };
    let profile = st.profiles.get(&payment.user_id).await?;
    render(kind, &payment, profile.as_ref())
}
