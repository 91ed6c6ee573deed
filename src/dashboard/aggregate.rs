use std::collections::HashMap;

use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    payments::repo_types::{PaymentRecord, PaymentStatus, PaymentWithPayer},
    profiles::repo_types::UserProfile,
    session::Role,
};

pub const RECENT_LIMIT: usize = 5;

/// Admin overview. `pending_count` is everything not yet approved.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DashboardSummary {
    pub total_students: i64,
    pub total_payments: i64,
    pub total_amount: i64,
    pub approved_count: i64,
    pub pending_count: i64,
    /// Whole percent, 0 when there are no payments.
    pub approval_rate: i64,
    pub recent: Vec<PaymentWithPayer>,
}

impl DashboardSummary {
    pub fn from_counts(
        total_students: i64,
        total_payments: i64,
        total_amount: i64,
        approved_count: i64,
        recent: Vec<PaymentWithPayer>,
    ) -> Self {
        Self {
            total_students,
            total_payments,
            total_amount,
            approved_count,
            pending_count: total_payments - approved_count,
            approval_rate: approval_rate(approved_count, total_payments),
            recent,
        }
    }
}

pub fn approval_rate(approved: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    (approved * 100 + total / 2) / total
}

/// Sort key for the recent list: newest first, undated records last.
fn recency(p: &PaymentRecord) -> i128 {
    p.submitted_at
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
        .unix_timestamp_nanos()
}

/// Single pass over already-loaded records. The Postgres store computes the
/// same numbers in SQL.
pub fn summarize(
    profiles: &[UserProfile],
    payments: &[PaymentRecord],
    recent_limit: usize,
) -> DashboardSummary {
    let total_students = profiles
        .iter()
        .filter(|p| p.role.as_deref().and_then(|r| r.parse::<Role>().ok()) == Some(Role::Student))
        .count() as i64;

    let (total_amount, approved_count) = payments.iter().fold((0i64, 0i64), |(sum, approved), p| {
        let approved = approved + i64::from(p.status == PaymentStatus::Approved);
        (sum + p.amount, approved)
    });

    let by_id: HashMap<&str, &UserProfile> = profiles.iter().map(|p| (p.id.as_str(), p)).collect();

    let mut ordered: Vec<&PaymentRecord> = payments.iter().collect();
    ordered.sort_by(|a, b| recency(b).cmp(&recency(a)).then_with(|| a.id.cmp(&b.id)));

    let recent = ordered
        .into_iter()
        .take(recent_limit)
        .map(|p| {
            let payer = by_id.get(p.user_id.as_str());
            PaymentWithPayer::join(
                p.clone(),
                payer.map(|u| u.name.clone()),
                payer.map(|u| u.reg_no.clone()),
                payer.map(|u| u.department.clone()),
            )
        })
        .collect();

    DashboardSummary::from_counts(
        total_students,
        payments.len() as i64,
        total_amount,
        approved_count,
        recent,
    )
}
