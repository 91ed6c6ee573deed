use anyhow::Context;
use async_trait::async_trait;
use time::OffsetDateTime;

use super::repo_types::{
    NewPayment, PaymentPayerRow, PaymentRecord, PaymentRow, PaymentStatus, PaymentWithPayer,
    StatusFilter,
};
use crate::db::{Pagination, PgStore};

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn insert_intent(&self, new: &NewPayment) -> anyhow::Result<PaymentRecord>;
    async fn get(&self, reference: &str) -> anyhow::Result<Option<PaymentRecord>>;
    /// Newest first.
    async fn list_by_user(&self, user_id: &str) -> anyhow::Result<Vec<PaymentRecord>>;
    /// Newest first, joined with the payer's profile.
    async fn list_all(&self, page: Pagination) -> anyhow::Result<Vec<PaymentWithPayer>>;
    async fn count_all(&self) -> anyhow::Result<i64>;
    /// Compare-and-set on status. `None` when the record is not in `from`.
    async fn transition(
        &self,
        reference: &str,
        from: PaymentStatus,
        to: PaymentStatus,
        at: OffsetDateTime,
    ) -> anyhow::Result<Option<PaymentRecord>>;
    async fn set_proof(&self, reference: &str, key: &str) -> anyhow::Result<()>;
    /// Pending intents submitted before `older_than`.
    async fn pending_intents(&self, older_than: OffsetDateTime) -> anyhow::Result<Vec<PaymentRecord>>;
}

const COLUMNS: &str =
    "id, user_id, level, amount, status, submitted_at, approved_at, updated_at, proof_key";

#[async_trait]
impl PaymentStore for PgStore {
    async fn insert_intent(&self, new: &NewPayment) -> anyhow::Result<PaymentRecord> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            r#"
            INSERT INTO payments (id, user_id, level, amount, status, submitted_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(&new.id)
        .bind(&new.user_id)
        .bind(&new.level)
        .bind(new.amount)
        .bind(PaymentStatus::Pending.as_str())
        .bind(new.submitted_at)
        .fetch_one(&self.db)
        .await
        .context("insert payment intent")?;
        Ok(row.into())
    }

    async fn get(&self, reference: &str) -> anyhow::Result<Option<PaymentRecord>> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {COLUMNS} FROM payments WHERE id = $1"
        ))
        .bind(reference)
        .fetch_optional(&self.db)
        .await
        .context("get payment")?;
        Ok(row.map(Into::into))
    }

    async fn list_by_user(&self, user_id: &str) -> anyhow::Result<Vec<PaymentRecord>> {
        let rows = sqlx::query_as::<_, PaymentRow>(&format!(
            r#"
            SELECT {COLUMNS}
              FROM payments
             WHERE user_id = $1
             ORDER BY submitted_at DESC NULLS LAST, id
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list payments by user")?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_all(&self, page: Pagination) -> anyhow::Result<Vec<PaymentWithPayer>> {
        let page = page.clamped();
        let rows = sqlx::query_as::<_, PaymentPayerRow>(
            r#"
            SELECT p.id, p.user_id, p.level, p.amount, p.status, p.submitted_at,
                   p.approved_at, p.updated_at, p.proof_key,
                   u.name AS payer_name, u.reg_no AS payer_reg_no,
                   u.department AS payer_department
              FROM payments p
              LEFT JOIN profiles u ON u.id = p.user_id
             ORDER BY p.submitted_at DESC NULLS LAST, p.id
             LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.db)
        .await
        .context("list payments")?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count_all(&self) -> anyhow::Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM payments")
            .fetch_one(&self.db)
            .await
            .context("count payments")?;
        Ok(count)
    }

    async fn transition(
        &self,
        reference: &str,
        from: PaymentStatus,
        to: PaymentStatus,
        at: OffsetDateTime,
    ) -> anyhow::Result<Option<PaymentRecord>> {
        let filter = StatusFilter::new(from);
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            r#"
            UPDATE payments
               SET status = $2,
                   updated_at = $3,
                   approved_at = CASE WHEN $2 = 'Approved' THEN $3 ELSE approved_at END
             WHERE id = $1 AND {matches}
            RETURNING {COLUMNS}
            "#,
            matches = StatusFilter::sql(None, 4),
        ))
        .bind(reference)
        .bind(to.as_str())
        .bind(at)
        .bind(&filter.aliases)
        .bind(filter.catch_all)
        .bind(&filter.others)
        .fetch_optional(&self.db)
        .await
        .context("transition payment status")?;
        Ok(row.map(Into::into))
    }

    async fn set_proof(&self, reference: &str, key: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE payments SET proof_key = $2, updated_at = now() WHERE id = $1")
            .bind(reference)
            .bind(key)
            .execute(&self.db)
            .await
            .context("set payment proof")?;
        Ok(())
    }

    async fn pending_intents(&self, older_than: OffsetDateTime) -> anyhow::Result<Vec<PaymentRecord>> {
        let pending = StatusFilter::new(PaymentStatus::Pending);
        let rows = sqlx::query_as::<_, PaymentRow>(&format!(
            r#"
            SELECT {COLUMNS}
              FROM payments
             WHERE submitted_at < $1 AND {matches}
             ORDER BY submitted_at
            "#,
            matches = StatusFilter::sql(None, 2),
        ))
        .bind(older_than)
        .bind(&pending.aliases)
        .bind(pending.catch_all)
        .bind(&pending.others)
        .fetch_all(&self.db)
        .await
        .context("list pending intents")?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
