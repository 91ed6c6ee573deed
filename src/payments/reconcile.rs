//! Background reconciliation of Pending intents against the gateway. Covers
//! the window where the gateway charged the card but the confirm call never
//! reached us, or its store write failed.

use time::OffsetDateTime;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::services::{settle, Settlement};
use crate::state::AppState;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    pub checked: usize,
    pub verified: usize,
    pub rejected: usize,
    pub unchanged: usize,
    pub errors: usize,
}

/// Runs until the task is aborted.
pub async fn run(state: AppState) {
    let portal = state.config.portal.clone();
    let mut interval = tokio::time::interval(portal.reconcile_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(
        interval_secs = portal.reconcile_interval.as_secs(),
        grace_secs = portal.reconcile_grace.as_secs(),
        "payment reconciler started"
    );

    loop {
        interval.tick().await;
        match reconcile_once(&state, OffsetDateTime::now_utc()).await {
            Ok(report) if report.checked == 0 => debug!("no pending intents to reconcile"),
            Ok(report) => info!(
                checked = report.checked,
                verified = report.verified,
                rejected = report.rejected,
                unchanged = report.unchanged,
                errors = report.errors,
                "reconciliation pass finished"
            ),
            Err(e) => error!(error = %format!("{e:#}"), "reconciliation pass failed"),
        }
    }
}

/// One pass over intents older than the grace period. Per-record failures
/// are counted and left for the next pass.
pub async fn reconcile_once(state: &AppState, now: OffsetDateTime) -> anyhow::Result<ReconcileReport> {
    let portal = &state.config.portal;
    let intents = state
        .payments
        .pending_intents(now - portal.reconcile_grace)
        .await?;

    let mut report = ReconcileReport::default();
    for intent in intents {
        report.checked += 1;
        let status = match state.gateway.verify(&intent.id).await {
            Ok(status) => status,
            Err(e) => {
                warn!(reference = %intent.id, error = %e, "gateway verify failed");
                report.errors += 1;
                continue;
            }
        };

        match settle(
            state.payments.as_ref(),
            &intent,
            status,
            now,
            portal.reconcile_expire,
        )
        .await
        {
            Ok(Settlement::Verified(_)) => {
                info!(reference = %intent.id, user_id = %intent.user_id, "recovered verified payment");
                report.verified += 1;
            }
            Ok(Settlement::Rejected(_)) => {
                info!(reference = %intent.id, user_id = %intent.user_id, "expired or failed intent rejected");
                report.rejected += 1;
            }
            Ok(Settlement::Unchanged) => report.unchanged += 1,
            Err(e) => {
                error!(reference = %intent.id, error = %e, "failed to record reconciliation");
                report.errors += 1;
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        payments::{gateway::GatewayStatus, repo_types::PaymentStatus},
        testing::{Fakes, MemoryStore},
    };

    fn intent(fakes: &Fakes, id: &str, age: time::Duration) -> OffsetDateTime {
        let now = OffsetDateTime::now_utc();
        let mut p = MemoryStore::payment(id, "u1", PaymentStatus::Pending);
        p.submitted_at = Some(now - age);
        fakes.store.insert_payment(p);
        now
    }

    #[tokio::test]
    async fn recovers_paid_intents_after_grace() {
        let fakes = Fakes::new();
        let st = fakes.state();
        let now = intent(&fakes, "ref-old", time::Duration::minutes(10));
        intent(&fakes, "ref-fresh", time::Duration::seconds(5));

        let report = reconcile_once(&st, now).await.unwrap();
        assert_eq!(report.checked, 1);
        assert_eq!(report.verified, 1);
        assert_eq!(
            fakes.store.stored_payment("ref-old").unwrap().status,
            PaymentStatus::VerifiedPendingApproval
        );
        assert_eq!(
            fakes.store.stored_payment("ref-fresh").unwrap().status,
            PaymentStatus::Pending
        );
    }

    #[tokio::test]
    async fn blank_and_unknown_statuses_count_as_pending() {
        let fakes = Fakes::new();
        let st = fakes.state();
        let now = intent(&fakes, "ref-null", time::Duration::minutes(10));
        intent(&fakes, "ref-odd", time::Duration::minutes(10));
        intent(&fakes, "ref-done", time::Duration::minutes(10));
        fakes.store.set_raw_status("ref-null", None);
        fakes.store.set_raw_status("ref-odd", Some("processing"));
        fakes.store.set_raw_status("ref-done", Some("APPROVED "));

        let report = reconcile_once(&st, now).await.unwrap();
        assert_eq!(report.checked, 2);
        assert_eq!(report.verified, 2);
        assert_eq!(
            fakes.store.stored_payment("ref-null").unwrap().status,
            PaymentStatus::VerifiedPendingApproval
        );
        assert_eq!(
            fakes.store.stored_payment("ref-done").unwrap().status,
            PaymentStatus::Approved
        );
    }

    #[tokio::test]
    async fn unknown_references_expire() {
        let fakes = Fakes::new();
        let st = fakes.state();
        fakes.gateway.set_default(GatewayStatus::NotFound);
        let now = intent(&fakes, "ref-stale", time::Duration::days(2));
        intent(&fakes, "ref-recent", time::Duration::hours(1));

        let report = reconcile_once(&st, now).await.unwrap();
        assert_eq!(report.rejected, 1);
        assert_eq!(report.unchanged, 1);
        assert_eq!(
            fakes.store.stored_payment("ref-stale").unwrap().status,
            PaymentStatus::Rejected
        );
    }

    #[tokio::test]
    async fn failed_gateway_payments_are_rejected() {
        let fakes = Fakes::new();
        let st = fakes.state();
        let now = intent(&fakes, "ref-x", time::Duration::minutes(5));
        fakes
            .gateway
            .set_status("ref-x", GatewayStatus::Failed("abandoned".into()));

        let report = reconcile_once(&st, now).await.unwrap();
        assert_eq!(report.rejected, 1);
    }

    #[tokio::test]
    async fn store_failures_are_counted_not_fatal() {
        let fakes = Fakes::new();
        let st = fakes.state();
        let now = intent(&fakes, "ref-y", time::Duration::minutes(5));
        fakes.store.fail_payment_writes(true);

        let report = reconcile_once(&st, now).await.unwrap();
        assert_eq!(report.errors, 1);
        assert_eq!(
            fakes.store.stored_payment("ref-y").unwrap().status,
            PaymentStatus::Pending
        );
    }
}
