use anyhow::{Context, Result};
use common_crypto::GatewaySigner;
use std::env;
use std::time::Duration;

pub const DEFAULT_SALT_INDEX: u32 = 1;
pub const DEFAULT_GATEWAY_BASE_URL: &str = "https://api.phonepe.com/apis/hermes";
pub const DEFAULT_ORDERS_PATH: &str = "/account/orders";

#[derive(Clone)]
pub struct CallbackConfig {
    pub merchant_id: String,
    pub signer: GatewaySigner,
    pub gateway_base_url: String,
    pub gateway_timeout: Duration,
    pub orders_path: String,
    pub database_url: Option<String>,
}

impl CallbackConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let merchant_id = lookup("PAYMENT_MERCHANT_ID")
            .filter(|v| !v.trim().is_empty())
            .context("PAYMENT_MERCHANT_ID must be set")?;
        let salt_key = lookup("PAYMENT_SALT_KEY")
            .filter(|v| !v.is_empty())
            .context("PAYMENT_SALT_KEY must be set")?;
        let salt_index = lookup("PAYMENT_SALT_INDEX")
            .and_then(|value| value.trim().parse::<u32>().ok())
            .unwrap_or(DEFAULT_SALT_INDEX);
        let gateway_base_url = lookup("PAYMENT_GATEWAY_BASE_URL")
            .unwrap_or_else(|| DEFAULT_GATEWAY_BASE_URL.to_string());
        let gateway_timeout_secs = lookup("PAYMENT_GATEWAY_TIMEOUT_SECS")
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(10);
        let orders_path = lookup("ORDERS_REDIRECT_PATH")
            .unwrap_or_else(|| DEFAULT_ORDERS_PATH.to_string());
        let database_url = lookup("DATABASE_URL").filter(|v| !v.is_empty());

        Ok(Self {
            merchant_id: merchant_id.trim().to_string(),
            signer: GatewaySigner::new(salt_key, salt_index),
            gateway_base_url: gateway_base_url.trim_end_matches('/').to_string(),
            gateway_timeout: Duration::from_secs(gateway_timeout_secs.max(1)),
            orders_path: normalize_path(&orders_path),
            database_url,
        })
    }
}

fn normalize_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

impl std::fmt::Debug for CallbackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackConfig")
            .field("merchant_id", &self.merchant_id)
            .field("signer", &self.signer)
            .field("gateway_base_url", &self.gateway_base_url)
            .field("gateway_timeout", &self.gateway_timeout)
            .field("orders_path", &self.orders_path)
            .field("database_url", &self.database_url.as_ref().map(|_| "***redacted***"))
            .finish()
    }
}
