use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use common_http_errors::{ApiError, ApiResult};
use serde::Serialize;
use tracing::error;
use uuid::Uuid;

use crate::app::AppState;
use crate::repo::PaymentStatus;

const MAX_ORDER_ID_LEN: usize = 128;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPaymentView {
    pub order_id: String,
    pub payment_status: PaymentStatus,
    pub gateway_transaction_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Payment state for the order pages. Raw gateway payloads stay server-side.
pub async fn get_order_payment(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> ApiResult<Json<OrderPaymentView>> {
    if order_id.trim().is_empty() || order_id.len() > MAX_ORDER_ID_LEN {
        return Err(ApiError::bad_request("invalid_order_id", None));
    }
    let order = state.orders.get(&order_id).await.map_err(|err| {
        let trace_id = Uuid::new_v4();
        error!(%trace_id, %order_id, error = %err, "Failed to load order payment");
        ApiError::internal("order store unavailable", Some(trace_id))
    })?;
    let order = order.ok_or_else(|| ApiError::not_found("order_not_found", None))?;
    Ok(Json(OrderPaymentView {
        order_id: order.id,
        payment_status: order.payment_status,
        gateway_transaction_id: order.gateway_transaction_id,
        updated_at: order.updated_at,
    }))
}
