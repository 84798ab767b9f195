use std::time::Instant;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::app::AppState;
use crate::reference::{ReferenceError, TransactionReference};
use crate::repo::{ApplyResult, PaymentStatus, PaymentUpdate};

pub const SIGNATURE_HEADER: &str = "X-VERIFY";

/// Callback body pushed by the gateway. Only the merchant reference is required;
/// the self-reported `code` is logged and never drives the outcome.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackNotification {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub merchant_id: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
    pub merchant_transaction_id: String,
}

/// Where the browser is sent once a callback has been handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectTarget {
    SecurityError,
    Error,
    PaymentFailed { order_id: String },
    PaymentCompleted { order_id: String },
}

impl RedirectTarget {
    pub fn for_status(order_id: &str, status: PaymentStatus) -> Self {
        match status {
            PaymentStatus::Completed => RedirectTarget::PaymentCompleted { order_id: order_id.to_string() },
            PaymentStatus::Pending | PaymentStatus::Failed => {
                RedirectTarget::PaymentFailed { order_id: order_id.to_string() }
            }
        }
    }

    pub fn location(&self, orders_path: &str) -> String {
        match self {
            RedirectTarget::SecurityError => format!("{orders_path}?paymentStatus=security_error"),
            RedirectTarget::Error => format!("{orders_path}?paymentStatus=error"),
            RedirectTarget::PaymentFailed { order_id } => format!(
                "{orders_path}?paymentStatus=failed&orderId={}",
                urlencoding::encode(order_id)
            ),
            RedirectTarget::PaymentCompleted { order_id } => {
                format!("{orders_path}/{}", urlencoding::encode(order_id))
            }
        }
    }

    pub fn outcome_label(&self) -> &'static str {
        match self {
            RedirectTarget::SecurityError => "security_error",
            RedirectTarget::Error => "error",
            RedirectTarget::PaymentFailed { .. } => "failed",
            RedirectTarget::PaymentCompleted { .. } => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackOutcome {
    pub target: RedirectTarget,
    /// The order was already settled and nothing was written.
    pub duplicate: bool,
}

impl CallbackOutcome {
    pub fn label(&self) -> &'static str {
        if self.duplicate {
            "duplicate"
        } else {
            self.target.outcome_label()
        }
    }
}

#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("malformed callback body: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("missing X-VERIFY header")]
    MissingSignature,
    #[error("callback signature mismatch")]
    SignatureMismatch,
    #[error("invalid transaction reference: {0}")]
    InvalidReference(#[from] ReferenceError),
    #[error("order {0} not found")]
    OrderNotFound(String),
    #[error("order store failure: {0:#}")]
    Store(anyhow::Error),
}

impl CallbackError {
    pub fn redirect(&self) -> RedirectTarget {
        match self {
            CallbackError::MissingSignature | CallbackError::SignatureMismatch => RedirectTarget::SecurityError,
            _ => RedirectTarget::Error,
        }
    }
}

/// `POST /payments/callback`. Every path ends in a `302 Found`.
pub async fn handle_payment_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let callback_id = Uuid::new_v4();
    let span = info_span!("payment_callback", %callback_id);
    let target = async {
        match process_callback(&state, &headers, &body).await {
            Ok(outcome) => {
                state.metrics.record_outcome(outcome.label());
                outcome.target
            }
            Err(err) => {
                let target = err.redirect();
                match target {
                    RedirectTarget::SecurityError => {
                        warn!(error = %err, "Rejected payment callback with invalid signature")
                    }
                    _ => warn!(error = %err, "Payment callback failed"),
                }
                state.metrics.record_outcome(target.outcome_label());
                target
            }
        }
    }
    .instrument(span)
    .await;
    found(target.location(&state.config.orders_path))
}

fn found(location: String) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

/// Parse, authenticate, verify with the gateway, then persist. Strictly in that order.
pub async fn process_callback(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<CallbackOutcome, CallbackError> {
    let raw: Value = serde_json::from_slice(body)?;

    let provided = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(CallbackError::MissingSignature)?;
    if !state.config.signer.verify(body, provided) {
        return Err(CallbackError::SignatureMismatch);
    }

    let notification: CallbackNotification = serde_json::from_value(raw.clone())?;
    let reference = TransactionReference::parse(&notification.merchant_transaction_id)?;
    let order_id = reference.order_id().to_string();
    if let Some(merchant_id) = notification.merchant_id.as_deref() {
        if merchant_id != state.config.merchant_id {
            warn!(%order_id, callback_merchant_id = merchant_id, "Callback names a different merchant; verifying against configured merchant");
        }
    }
    info!(
        %order_id,
        merchant_transaction_id = reference.as_str(),
        reported_code = notification.code.as_deref().unwrap_or("-"),
        "Payment callback authenticated"
    );

    let started = Instant::now();
    let verification = state
        .verifier
        .check_status(&state.config.merchant_id, reference.as_str())
        .await;
    state.metrics.verification_seconds.observe(started.elapsed().as_secs_f64());

    let (status, gateway_transaction_id, status_raw) = match verification {
        Ok(check) => {
            let status = if check.is_payment_success() {
                PaymentStatus::Completed
            } else {
                PaymentStatus::Failed
            };
            let txn = check.transaction_id.clone().or_else(|| notification.transaction_id.clone());
            (status, txn, check.raw)
        }
        Err(err) => {
            warn!(%order_id, error = %err, "Gateway status check failed; marking payment failed");
            (
                PaymentStatus::Failed,
                notification.transaction_id.clone(),
                json!({ "error": format!("{err:#}") }),
            )
        }
    };

    let update = PaymentUpdate {
        status,
        gateway_transaction_id,
        callback_raw: raw,
        status_raw,
    };
    match state
        .orders
        .apply_payment(&order_id, update)
        .await
        .map_err(CallbackError::Store)?
    {
        ApplyResult::Applied(order) => {
            info!(%order_id, status = order.payment_status.as_str(), "Order payment status updated");
            Ok(CallbackOutcome {
                target: RedirectTarget::for_status(&order_id, order.payment_status),
                duplicate: false,
            })
        }
        ApplyResult::AlreadySettled(order) => {
            info!(
                %order_id,
                stored = order.payment_status.as_str(),
                verified = status.as_str(),
                "Order already settled; ignoring repeated callback"
            );
            Ok(CallbackOutcome {
                target: RedirectTarget::for_status(&order_id, order.payment_status),
                duplicate: true,
            })
        }
        ApplyResult::NotFound => Err(CallbackError::OrderNotFound(order_id)),
    }
}
