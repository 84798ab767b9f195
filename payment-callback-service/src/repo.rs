use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<PaymentStatus> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "completed" => Some(PaymentStatus::Completed),
            "failed" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }
}

/// Valid payment transitions:
/// pending -> completed | failed
/// Terminal statuses never move again, including back to pending.
pub fn is_valid_transition(from: PaymentStatus, to: PaymentStatus) -> bool {
    matches!(
        (from, to),
        (PaymentStatus::Pending, PaymentStatus::Completed | PaymentStatus::Failed)
    )
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPayment {
    pub id: String,
    pub payment_status: PaymentStatus,
    pub gateway_transaction_id: Option<String>,
    pub gateway_callback_raw: Option<serde_json::Value>,
    pub gateway_status_raw: Option<serde_json::Value>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PaymentUpdate {
    pub status: PaymentStatus,
    pub gateway_transaction_id: Option<String>,
    pub callback_raw: serde_json::Value,
    pub status_raw: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApplyResult {
    Applied(OrderPayment),
    /// The order had already left `pending`; nothing was written.
    AlreadySettled(OrderPayment),
    NotFound,
}

#[async_trait::async_trait]
pub trait OrderStore: Send + Sync {
    async fn get(&self, order_id: &str) -> Result<Option<OrderPayment>>;
    /// Transition a pending order. Never overwrites a terminal status.
    async fn apply_payment(&self, order_id: &str, update: PaymentUpdate) -> Result<ApplyResult>;
}

#[derive(sqlx::FromRow)]
struct OrderPaymentRow {
    id: String,
    payment_status: String,
    gateway_transaction_id: Option<String>,
    gateway_callback_raw: Option<serde_json::Value>,
    gateway_status_raw: Option<serde_json::Value>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderPaymentRow> for OrderPayment {
    type Error = anyhow::Error;

    fn try_from(row: OrderPaymentRow) -> Result<Self> {
        let payment_status = PaymentStatus::from_str(&row.payment_status).ok_or_else(|| {
            anyhow::anyhow!("order {} has unknown payment_status {:?}", row.id, row.payment_status)
        })?;
        Ok(OrderPayment {
            id: row.id,
            payment_status,
            gateway_transaction_id: row.gateway_transaction_id,
            gateway_callback_raw: row.gateway_callback_raw,
            gateway_status_raw: row.gateway_status_raw,
            updated_at: row.updated_at,
        })
    }
}

/// Postgres-backed store over the `orders` table.
#[derive(Clone)]
pub struct PgOrderStore {
    db: PgPool,
}

impl PgOrderStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl OrderStore for PgOrderStore {
    async fn get(&self, order_id: &str) -> Result<Option<OrderPayment>> {
        let rec = sqlx::query_as::<_, OrderPaymentRow>(
            r#"SELECT id, payment_status, gateway_transaction_id, gateway_callback_raw, gateway_status_raw, updated_at
               FROM orders WHERE id = $1"#,
        )
        .bind(order_id)
        .fetch_optional(&self.db)
        .await?;
        rec.map(OrderPayment::try_from).transpose()
    }

    async fn apply_payment(&self, order_id: &str, update: PaymentUpdate) -> Result<ApplyResult> {
        let rec = sqlx::query_as::<_, OrderPaymentRow>(
            r#"UPDATE orders
               SET payment_status = $2,
                   gateway_transaction_id = COALESCE($3, gateway_transaction_id),
                   gateway_callback_raw = $4,
                   gateway_status_raw = $5,
                   updated_at = now()
               WHERE id = $1 AND payment_status = 'pending'
               RETURNING id, payment_status, gateway_transaction_id, gateway_callback_raw, gateway_status_raw, updated_at"#,
        )
        .bind(order_id)
        .bind(update.status.as_str())
        .bind(update.gateway_transaction_id.as_deref())
        .bind(&update.callback_raw)
        .bind(&update.status_raw)
        .fetch_optional(&self.db)
        .await?;
        if let Some(row) = rec {
            return Ok(ApplyResult::Applied(row.try_into()?));
        }
        Ok(match self.get(order_id).await? {
            Some(existing) => ApplyResult::AlreadySettled(existing),
            None => ApplyResult::NotFound,
        })
    }
}

/// In-process store for local runs without a database and for tests.
#[derive(Default)]
pub struct MemoryOrderStore {
    orders: RwLock<HashMap<String, OrderPayment>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an order as checkout would: pending, no gateway data yet.
    pub async fn insert_pending(&self, order_id: &str) {
        let order = OrderPayment {
            id: order_id.to_string(),
            payment_status: PaymentStatus::Pending,
            gateway_transaction_id: None,
            gateway_callback_raw: None,
            gateway_status_raw: None,
            updated_at: Utc::now(),
        };
        self.orders.write().await.insert(order_id.to_string(), order);
    }
}

#[async_trait::async_trait]
impl OrderStore for MemoryOrderStore {
    async fn get(&self, order_id: &str) -> Result<Option<OrderPayment>> {
        Ok(self.orders.read().await.get(order_id).cloned())
    }

    async fn apply_payment(&self, order_id: &str, update: PaymentUpdate) -> Result<ApplyResult> {
        let mut guard = self.orders.write().await;
        let Some(order) = guard.get_mut(order_id) else {
            return Ok(ApplyResult::NotFound);
        };
        if !is_valid_transition(order.payment_status, update.status) {
            return Ok(ApplyResult::AlreadySettled(order.clone()));
        }
        order.payment_status = update.status;
        if update.gateway_transaction_id.is_some() {
            order.gateway_transaction_id = update.gateway_transaction_id;
        }
        order.gateway_callback_raw = Some(update.callback_raw);
        order.gateway_status_raw = Some(update.status_raw);
        order.updated_at = Utc::now();
        Ok(ApplyResult::Applied(order.clone()))
    }
}
