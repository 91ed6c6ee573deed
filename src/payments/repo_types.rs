use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use tracing::warn;

use crate::db::{normalize_stored, normalized};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PaymentStatus {
    /// Intent written before the gateway was invoked.
    Pending,
    #[serde(rename = "Verified-Pending-Approval")]
    VerifiedPendingApproval,
    Approved,
    Rejected,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::VerifiedPendingApproval => "Verified-Pending-Approval",
            PaymentStatus::Approved => "Approved",
            PaymentStatus::Rejected => "Rejected",
        }
    }

    /// Every raw value that reads back as this status.
    pub fn storage_aliases(&self) -> &'static [&'static str] {
        match self {
            PaymentStatus::Pending => &["Pending"],
            PaymentStatus::VerifiedPendingApproval => {
                &["Verified-Pending-Approval", "Verified - Pending Approval"]
            }
            PaymentStatus::Approved => &["Approved"],
            PaymentStatus::Rejected => &["Rejected", "Failed"],
        }
    }

    const ALL: [PaymentStatus; 4] = [
        PaymentStatus::Pending,
        PaymentStatus::VerifiedPendingApproval,
        PaymentStatus::Approved,
        PaymentStatus::Rejected,
    ];

    /// Normalized aliases, ready to bind against `db::normalized("status")`.
    pub fn normalized_aliases(&self) -> Vec<String> {
        self.storage_aliases().iter().map(|a| normalize_stored(a)).collect()
    }

    /// Total mapping from the stored string; anything unknown reads as pending.
    pub fn from_raw(raw: Option<&str>) -> Self {
        let Some(norm) = raw.map(normalize_stored).filter(|s| !s.is_empty()) else {
            return PaymentStatus::Pending;
        };
        Self::ALL
            .into_iter()
            .find(|s| s.normalized_aliases().contains(&norm))
            .unwrap_or_else(|| {
                warn!(status = ?raw, "unknown payment status, treating as pending");
                PaymentStatus::Pending
            })
    }

    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (PaymentStatus::Pending, PaymentStatus::VerifiedPendingApproval)
                | (PaymentStatus::Pending, PaymentStatus::Rejected)
                | (PaymentStatus::VerifiedPendingApproval, PaymentStatus::Approved)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Approved | PaymentStatus::Rejected)
    }

    /// Label used on status badges.
    pub fn badge(&self) -> &'static str {
        match self {
            PaymentStatus::Pending | PaymentStatus::VerifiedPendingApproval => "Pending",
            PaymentStatus::Approved => "Approved",
            PaymentStatus::Rejected => "Failed",
        }
    }
}

/// Selects exactly the rows whose stored status [`PaymentStatus::from_raw`]
/// decodes as `status`. Pending also owns NULL, blank and unknown values.
#[derive(Debug, Clone)]
pub struct StatusFilter {
    pub aliases: Vec<String>,
    pub catch_all: bool,
    pub others: Vec<String>,
}

impl StatusFilter {
    pub fn new(status: PaymentStatus) -> Self {
        Self {
            aliases: status.normalized_aliases(),
            catch_all: status == PaymentStatus::Pending,
            others: PaymentStatus::ALL
                .into_iter()
                .filter(|s| *s != status)
                .flat_map(|s| s.normalized_aliases())
                .collect(),
        }
    }

    /// Predicate over the `status` column of `table`, binding `aliases`,
    /// `catch_all` and `others` as `$first`, `$first + 1` and `$first + 2`.
    pub fn sql(table: Option<&str>, first: usize) -> String {
        let col = match table {
            Some(t) => format!("{t}.status"),
            None => "status".to_string(),
        };
        let norm = normalized(&col);
        format!(
            "({norm} = ANY(${a}) OR (${c} AND ({col} IS NULL OR {norm} <> ALL(${o}))))",
            a = first,
            c = first + 1,
            o = first + 2,
        )
    }

    /// Same predicate as [`StatusFilter::sql`], evaluated in memory.
    pub fn matches(&self, raw: Option<&str>) -> bool {
        let norm = raw.map(normalize_stored);
        match norm {
            Some(n) if self.aliases.contains(&n) => true,
            Some(n) => self.catch_all && !self.others.contains(&n),
            None => self.catch_all,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct PaymentRow {
    pub id: String,
    pub user_id: String,
    pub level: String,
    pub amount: i64,
    pub status: Option<String>,
    pub submitted_at: Option<OffsetDateTime>,
    pub approved_at: Option<OffsetDateTime>,
    pub updated_at: Option<OffsetDateTime>,
    pub proof_key: Option<String>,
}

/// A dues payment; `id` is the gateway transaction reference.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PaymentRecord {
    pub id: String,
    pub user_id: String,
    pub level: String,
    pub amount: i64, // naira
    pub status: PaymentStatus,
    #[serde(with = "time::serde::rfc3339::option")]
    pub submitted_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub approved_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
    #[serde(skip_serializing)]
    pub proof_key: Option<String>,
}

impl From<PaymentRow> for PaymentRecord {
    fn from(r: PaymentRow) -> Self {
        Self {
            status: PaymentStatus::from_raw(r.status.as_deref()),
            id: r.id,
            user_id: r.user_id,
            level: r.level,
            amount: r.amount,
            submitted_at: r.submitted_at,
            approved_at: r.approved_at,
            updated_at: r.updated_at,
            proof_key: r.proof_key,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub id: String,
    pub user_id: String,
    pub level: String,
    pub amount: i64,
    pub submitted_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
pub struct PaymentPayerRow {
    #[sqlx(flatten)]
    pub payment: PaymentRow,
    pub payer_name: Option<String>,
    pub payer_reg_no: Option<String>,
    pub payer_department: Option<String>,
}

/// Payment joined with its payer's profile; orphans keep placeholders.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PaymentWithPayer {
    #[serde(flatten)]
    pub payment: PaymentRecord,
    pub name: String,
    pub reg_no: String,
    pub department: String,
}

pub const MISSING_FIELD: &str = "N/A";
pub const MISSING_DEPARTMENT: &str = "—";

impl PaymentWithPayer {
    pub fn join(
        payment: PaymentRecord,
        name: Option<String>,
        reg_no: Option<String>,
        department: Option<String>,
    ) -> Self {
        let or = |v: Option<String>, fallback: &str| {
            v.filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| fallback.to_string())
        };
        Self {
            payment,
            name: or(name, MISSING_FIELD),
            reg_no: or(reg_no, MISSING_FIELD),
            department: or(department, MISSING_DEPARTMENT),
        }
    }
}

impl From<PaymentPayerRow> for PaymentWithPayer {
    fn from(r: PaymentPayerRow) -> Self {
        Self::join(
            r.payment.into(),
            r.payer_name,
            r.payer_reg_no,
            r.payer_department,
        )
    }
}
