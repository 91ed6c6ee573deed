use serde::{Deserialize, Serialize};

use super::{
    pricing::{LevelPrice, CURRENCY},
    repo_types::PaymentRecord,
    services::CheckoutConfig,
};
use crate::receipts::ReceiptKind;

#[derive(Debug, Deserialize)]
pub struct InitiatePaymentRequest {
    pub level: String,
}

#[derive(Debug, Serialize)]
pub struct InitiatePaymentResponse {
    pub payment: PaymentRecord,
    pub checkout: CheckoutConfig,
}

#[derive(Debug, Serialize)]
pub struct LevelsResponse {
    pub currency: &'static str,
    pub levels: Vec<LevelPrice>,
}

impl LevelsResponse {
    pub fn new(levels: Vec<LevelPrice>) -> Self {
        Self {
            currency: CURRENCY,
            levels,
        }
    }
}

/// A payment as listed to its owner, with the receipt it qualifies for.
#[derive(Debug, Serialize)]
pub struct PaymentView {
    #[serde(flatten)]
    pub payment: PaymentRecord,
    pub badge: &'static str,
    pub has_proof: bool,
    pub receipt: Option<&'static str>,
}

impl From<PaymentRecord> for PaymentView {
    fn from(payment: PaymentRecord) -> Self {
        Self {
            badge: payment.status.badge(),
            has_proof: payment.proof_key.is_some(),
            receipt: crate::receipts::offered(payment.status).map(|k| k.as_str()),
            payment,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ReceiptQuery {
    pub kind: Option<ReceiptKind>,
}

#[derive(Debug, Serialize)]
pub struct ProofUrlResponse {
    pub url: String,
}
