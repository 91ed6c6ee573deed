//! Payment gateway abstraction. The browser widget collects the card; the
//! server only ever verifies references with the gateway.

use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::config::GatewayConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayStatus {
    /// `amount_minor` is `None` when the gateway does not report it.
    Succeeded { amount_minor: Option<i64> },
    Failed(String),
    InFlight,
    NotFound,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn name(&self) -> &'static str;
    /// Key handed to the browser widget.
    fn public_key(&self) -> &str;
    async fn verify(&self, reference: &str) -> anyhow::Result<GatewayStatus>;
}

pub fn create_gateway(config: &GatewayConfig) -> anyhow::Result<Arc<dyn PaymentGateway>> {
    Ok(match config {
        GatewayConfig::Paystack {
            public_key,
            secret_key,
            base_url,
        } => Arc::new(PaystackGateway::new(
            public_key.clone(),
            secret_key.clone(),
            base_url.clone(),
        )?),
        GatewayConfig::Dummy => Arc::new(DummyGateway),
    })
}

pub struct PaystackGateway {
    client: Client,
    public_key: String,
    secret_key: String,
    base_url: String,
}

impl PaystackGateway {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

    pub fn new(public_key: String, secret_key: String, base_url: String) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()
            .context("build paystack client")?;
        Ok(Self {
            client,
            public_key,
            secret_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct VerifyEnvelope {
    status: bool,
    #[serde(default)]
    message: String,
    data: Option<VerifyData>,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    status: String,
    amount: Option<i64>,
}

fn classify(data: &VerifyData) -> GatewayStatus {
    match data.status.as_str() {
        "success" => GatewayStatus::Succeeded {
            amount_minor: data.amount,
        },
        "failed" | "abandoned" | "reversed" => GatewayStatus::Failed(data.status.clone()),
        _ => GatewayStatus::InFlight,
    }
}

#[async_trait]
impl PaymentGateway for PaystackGateway {
    fn name(&self) -> &'static str {
        "paystack"
    }

    fn public_key(&self) -> &str {
        &self.public_key
    }

    #[instrument(skip(self))]
    async fn verify(&self, reference: &str) -> anyhow::Result<GatewayStatus> {
        let url = format!("{}/transaction/verify/{}", self.base_url, reference);
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .context("paystack verify request")?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(GatewayStatus::NotFound);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("paystack verify failed: {} - {}", status, body));
        }

        let envelope: VerifyEnvelope = response.json().await.context("decode paystack verify")?;
        debug!(reference, message = %envelope.message, "paystack verify response");
        match (envelope.status, envelope.data) {
            (true, Some(data)) => Ok(classify(&data)),
            _ => Ok(GatewayStatus::NotFound),
        }
    }
}

/// Development gateway: every reference is paid.
pub struct DummyGateway;

#[async_trait]
impl PaymentGateway for DummyGateway {
    fn name(&self) -> &'static str {
        "dummy"
    }

    fn public_key(&self) -> &str {
        "pk_test_dummy"
    }

    async fn verify(&self, reference: &str) -> anyhow::Result<GatewayStatus> {
        tracing::info!(reference, "dummy gateway reports success");
        Ok(GatewayStatus::Succeeded { amount_minor: None })
    }
}
