use anyhow::Context;
use async_trait::async_trait;

use super::aggregate::DashboardSummary;
use crate::{
    db::{normalized, PgStore},
    payments::repo_types::{PaymentPayerRow, PaymentStatus, PaymentWithPayer, StatusFilter},
};

#[async_trait]
pub trait DashboardStore: Send + Sync {
    async fn dashboard(&self, recent_limit: usize) -> anyhow::Result<DashboardSummary>;
}

#[derive(sqlx::FromRow)]
struct Totals {
    total_students: i64,
    total_payments: i64,
    total_amount: i64,
    approved_count: i64,
}

#[async_trait]
impl DashboardStore for PgStore {
    async fn dashboard(&self, recent_limit: usize) -> anyhow::Result<DashboardSummary> {
        let approved = StatusFilter::new(PaymentStatus::Approved);
        let totals_sql = format!(
            r#"
            SELECT
                (SELECT COUNT(*) FROM profiles WHERE {role} = 'student') AS total_students,
                COUNT(p.id) AS total_payments,
                COALESCE(SUM(p.amount), 0)::BIGINT AS total_amount,
                COUNT(p.id) FILTER (WHERE {approved}) AS approved_count
              FROM payments p
            "#,
            role = normalized("role"),
            approved = StatusFilter::sql(Some("p"), 1),
        );
        let totals = sqlx::query_as::<_, Totals>(&totals_sql)
            .bind(&approved.aliases)
            .bind(approved.catch_all)
            .bind(&approved.others)
            .fetch_one(&self.db);

        let recent = sqlx::query_as::<_, PaymentPayerRow>(
            r#"
            SELECT p.id, p.user_id, p.level, p.amount, p.status, p.submitted_at,
                   p.approved_at, p.updated_at, p.proof_key,
                   u.name AS payer_name, u.reg_no AS payer_reg_no,
                   u.department AS payer_department
              FROM payments p
              LEFT JOIN profiles u ON u.id = p.user_id
             ORDER BY p.submitted_at DESC NULLS LAST, p.id
             LIMIT $1
            "#,
        )
        .bind(recent_limit as i64)
        .fetch_all(&self.db);

        let (totals, recent) = tokio::try_join!(totals, recent).context("load dashboard")?;

        Ok(DashboardSummary::from_counts(
            totals.total_students,
            totals.total_payments,
            totals.total_amount,
            totals.approved_count,
            recent.into_iter().map(PaymentWithPayer::from).collect(),
        ))
    }
}
