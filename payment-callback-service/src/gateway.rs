use anyhow::{anyhow, Context, Result};
use common_crypto::GatewaySigner;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::CallbackConfig;

/// Code the gateway reports for a settled, successful payment.
pub const PAYMENT_SUCCESS_CODE: &str = "PAYMENT_SUCCESS";

/// Authoritative payment status as reported by the gateway's status-check endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusCheck {
    pub success: bool,
    pub code: String,
    pub transaction_id: Option<String>,
    pub raw: Value,
}

impl StatusCheck {
    pub fn is_payment_success(&self) -> bool {
        self.success && self.code == PAYMENT_SUCCESS_CODE
    }

    pub fn from_raw(raw: Value) -> Result<Self> {
        #[derive(Deserialize)]
        struct Envelope {
            success: bool,
            code: String,
            #[serde(default)]
            data: Option<EnvelopeData>,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct EnvelopeData {
            transaction_id: Option<String>,
        }

        let envelope: Envelope = serde_json::from_value(raw.clone())
            .context("status response missing success/code")?;
        Ok(Self {
            success: envelope.success,
            code: envelope.code,
            transaction_id: envelope.data.and_then(|d| d.transaction_id),
            raw,
        })
    }
}

#[async_trait::async_trait]
pub trait StatusVerifier: Send + Sync {
    async fn check_status(&self, merchant_id: &str, merchant_transaction_id: &str) -> Result<StatusCheck>;
}

pub fn status_path(merchant_id: &str, merchant_transaction_id: &str) -> String {
    format!(
        "/pg/v1/status/{}/{}",
        urlencoding::encode(merchant_id),
        urlencoding::encode(merchant_transaction_id)
    )
}

pub struct HttpStatusVerifier {
    client: Client,
    base_url: String,
    signer: GatewaySigner,
}

impl HttpStatusVerifier {
    pub fn new(config: &CallbackConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.gateway_timeout)
            .build()
            .context("failed to build gateway http client")?;
        Ok(Self {
            client,
            base_url: config.gateway_base_url.clone(),
            signer: config.signer.clone(),
        })
    }
}

#[async_trait::async_trait]
impl StatusVerifier for HttpStatusVerifier {
    async fn check_status(&self, merchant_id: &str, merchant_transaction_id: &str) -> Result<StatusCheck> {
        let path = status_path(merchant_id, merchant_transaction_id);
        let checksum = self.signer.sign(path.as_bytes());
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "Querying gateway payment status");

        let resp = self
            .client
            .get(&url)
            .header(CONTENT_TYPE, "application/json")
            .header("X-VERIFY", checksum)
            .header("X-MERCHANT-ID", merchant_id)
            .send()
            .await
            .context("status check request failed")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("status check returned {status}: {body}"));
        }
        let raw: Value = resp
            .json()
            .await
            .context("status check returned a non-JSON body")?;
        StatusCheck::from_raw(raw)
    }
}
