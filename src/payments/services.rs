use std::time::Duration;

use serde::Serialize;
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};

use super::{
    gateway::GatewayStatus,
    pricing::{new_reference, price_for, to_minor_units, CURRENCY},
    repo::PaymentStore,
    repo_types::{NewPayment, PaymentRecord, PaymentStatus, PaymentWithPayer},
};
use crate::{
    db::{Page, Pagination},
    error::{AppError, AppResult},
    images::{services as uploads, UploadItem},
    session::Session,
    state::AppState,
};

/// What the browser widget needs to collect the payment.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CheckoutConfig {
    pub public_key: String,
    pub email: String,
    /// Kobo.
    pub amount: i64,
    pub reference: String,
    pub currency: &'static str,
}

/// Writes the Pending intent, then hands back the widget configuration.
#[instrument(skip(st, session), fields(user_id = %session.user_id))]
pub async fn initiate(
    st: &AppState,
    session: &Session,
    level: &str,
) -> AppResult<(PaymentRecord, CheckoutConfig)> {
    let level = level.trim();
    let amount = price_for(level).ok_or_else(|| AppError::validation("Please select a valid level"))?;

    let now = OffsetDateTime::now_utc();
    let reference = new_reference(&session.user_id, now);
    let record = st
        .payments
        .insert_intent(&NewPayment {
            id: reference.clone(),
            user_id: session.user_id.clone(),
            level: level.to_string(),
            amount,
            submitted_at: now,
        })
        .await?;

    info!(reference = %record.id, level, amount, "payment intent recorded");
    Ok((
        record,
        CheckoutConfig {
            public_key: st.gateway.public_key().to_string(),
            email: session.email.clone(),
            amount: to_minor_units(amount),
            reference,
            currency: CURRENCY,
        },
    ))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    Verified(PaymentRecord),
    Rejected(PaymentRecord),
    /// Nothing to do yet, or another writer moved the record first.
    Unchanged,
}

/// Applies a gateway answer to a Pending record. Shared by the widget
/// callback and the reconciler.
pub async fn settle(
    payments: &dyn PaymentStore,
    record: &PaymentRecord,
    status: GatewayStatus,
    now: OffsetDateTime,
    expire_after: Duration,
) -> anyhow::Result<Settlement> {
    let target = match status {
        GatewayStatus::Succeeded {
            amount_minor: Some(paid),
        } if paid != to_minor_units(record.amount) => {
            error!(
                reference = %record.id,
                expected = to_minor_units(record.amount),
                paid,
                "gateway amount does not match intent"
            );
            PaymentStatus::Rejected
        }
        GatewayStatus::Succeeded { .. } => PaymentStatus::VerifiedPendingApproval,
        GatewayStatus::Failed(reason) => {
            warn!(reference = %record.id, reason = %reason, "gateway reports failure");
            PaymentStatus::Rejected
        }
        GatewayStatus::InFlight => return Ok(Settlement::Unchanged),
        GatewayStatus::NotFound => {
            let expired = record
                .submitted_at
                .map_or(true, |at| at + expire_after <= now);
            if !expired {
                return Ok(Settlement::Unchanged);
            }
            warn!(reference = %record.id, "no gateway record before expiry");
            PaymentStatus::Rejected
        }
    };

    let moved = payments
        .transition(&record.id, PaymentStatus::Pending, target, now)
        .await?;
    Ok(match moved {
        Some(updated) if target == PaymentStatus::Rejected => Settlement::Rejected(updated),
        Some(updated) => Settlement::Verified(updated),
        None => Settlement::Unchanged,
    })
}

async fn load(st: &AppState, reference: &str) -> AppResult<PaymentRecord> {
    st.payments
        .get(reference)
        .await?
        .ok_or(AppError::NotFound("Payment"))
}

fn ensure_owner(session: &Session, record: &PaymentRecord) -> AppResult<()> {
    if record.user_id != session.user_id {
        warn!(user_id = %session.user_id, reference = %record.id, "payment belongs to another user");
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn ensure_owner_or_admin(session: &Session, record: &PaymentRecord) -> AppResult<()> {
    if session.is_admin() {
        return Ok(());
    }
    ensure_owner(session, record)
}

/// Widget success callback. A store failure here leaves the intent Pending
/// for the reconciler.
#[instrument(skip(st, session), fields(user_id = %session.user_id))]
pub async fn confirm(st: &AppState, session: &Session, reference: &str) -> AppResult<PaymentRecord> {
    let record = load(st, reference).await?;
    ensure_owner(session, &record)?;
    if record.status != PaymentStatus::Pending {
        return Ok(record);
    }

    let status = st
        .gateway
        .verify(reference)
        .await
        .map_err(|e| AppError::Gateway(format!("{e:#}")))?;

    let now = OffsetDateTime::now_utc();
    match settle(
        st.payments.as_ref(),
        &record,
        status,
        now,
        st.config.portal.reconcile_expire,
    )
    .await?
    {
        Settlement::Verified(updated) => {
            info!(reference, "payment verified, awaiting approval");
            Ok(updated)
        }
        Settlement::Rejected(updated) => Ok(updated),
        Settlement::Unchanged => load(st, reference).await,
    }
}

/// Only `Verified-Pending-Approval` moves to `Approved`; losers of a race get
/// a conflict.
#[instrument(skip(st))]
pub async fn approve(st: &AppState, admin_id: &str, reference: &str) -> AppResult<PaymentRecord> {
    let record = load(st, reference).await?;
    match record.status {
        PaymentStatus::VerifiedPendingApproval => {}
        PaymentStatus::Approved => {
            return Err(AppError::Conflict("Payment is already approved".into()))
        }
        PaymentStatus::Pending => {
            return Err(AppError::Conflict(
                "Payment has not been verified by the payment provider yet".into(),
            ))
        }
        PaymentStatus::Rejected => {
            return Err(AppError::Conflict("Rejected payments cannot be approved".into()))
        }
    }

    let now = OffsetDateTime::now_utc();
    let updated = st
        .payments
        .transition(
            reference,
            PaymentStatus::VerifiedPendingApproval,
            PaymentStatus::Approved,
            now,
        )
        .await?
        .ok_or_else(|| {
            warn!(reference, admin_id, "approval lost a race");
            AppError::Conflict("Payment was updated by someone else. Please refresh".into())
        })?;

    info!(reference, admin_id, "payment approved");
    Ok(updated)
}

#[instrument(skip(st, session, item), fields(user_id = %session.user_id))]
pub async fn attach_proof(
    st: &AppState,
    session: &Session,
    reference: &str,
    item: UploadItem,
) -> AppResult<PaymentRecord> {
    let record = load(st, reference).await?;
    ensure_owner(session, &record)?;
    if record.status == PaymentStatus::Rejected {
        return Err(AppError::Conflict(
            "Proof cannot be attached to a rejected payment".into(),
        ));
    }

    let key = uploads::store_proof(st, &session.user_id, reference, item).await?;
    st.payments.set_proof(reference, &key).await?;

    if let Some(previous) = record.proof_key.as_deref().filter(|old| *old != key) {
        if let Err(e) = st.storage.delete_object(previous).await {
            warn!(error = %e, key = previous, "failed to remove replaced proof");
        }
    }

    info!(reference, key = %key, "payment proof attached");
    load(st, reference).await
}

/// Short-lived link to the stored proof.
pub async fn proof_url(st: &AppState, session: &Session, reference: &str) -> AppResult<String> {
    let record = load(st, reference).await?;
    ensure_owner_or_admin(session, &record)?;
    let key = record
        .proof_key
        .ok_or(AppError::NotFound("Payment proof"))?;
    Ok(uploads::presign_proof(st, &key).await?)
}

pub async fn history(st: &AppState, user_id: &str) -> AppResult<Vec<PaymentRecord>> {
    Ok(st.payments.list_by_user(user_id).await?)
}

pub async fn get_visible(st: &AppState, session: &Session, reference: &str) -> AppResult<PaymentRecord> {
    let record = load(st, reference).await?;
    ensure_owner_or_admin(session, &record)?;
    Ok(record)
}

pub async fn list_all(st: &AppState, page: Pagination) -> AppResult<Page<PaymentWithPayer>> {
    let page = page.clamped();
    let (items, total) = tokio::try_join!(st.payments.list_all(page), st.payments.count_all())?;
    Ok(Page::new(items, total, page))
}
