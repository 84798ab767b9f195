use payment_callback_service::repo::{ApplyResult, PaymentStatus, PaymentUpdate};
use payment_callback_service::{OrderStore, PgOrderStore};
use serde_json::json;
use sqlx::{Executor, PgPool};

#[tokio::test]
#[ignore]
async fn conditional_update_only_moves_pending_orders() {
    let dsn = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for this ignored test");
    let pool = PgPool::connect(&dsn).await.unwrap();

    // Minimal shape of the storefront's orders table for the columns this service touches.
    pool.execute(r#"
    CREATE TABLE IF NOT EXISTS orders (
        id TEXT PRIMARY KEY,
        payment_status TEXT NOT NULL DEFAULT 'pending',
        gateway_transaction_id TEXT NULL,
        gateway_callback_raw JSONB NULL,
        gateway_status_raw JSONB NULL,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    );
    "#).await.unwrap();
    sqlx::query("DELETE FROM orders WHERE id = $1").bind("pg-itest-1").execute(&pool).await.unwrap();
    sqlx::query("INSERT INTO orders (id) VALUES ($1)").bind("pg-itest-1").execute(&pool).await.unwrap();

    let store = PgOrderStore::new(pool);
    let update = |status: PaymentStatus, txn: &str| PaymentUpdate {
        status,
        gateway_transaction_id: Some(txn.to_string()),
        callback_raw: json!({"merchantTransactionId": "Opg-itest-1"}),
        status_raw: json!({"code": "X"}),
    };

    let first = store.apply_payment("pg-itest-1", update(PaymentStatus::Completed, "T1")).await.unwrap();
    let applied = match first {
        ApplyResult::Applied(order) => order,
        other => panic!("expected applied, got {other:?}"),
    };
    assert_eq!(applied.payment_status, PaymentStatus::Completed);
    assert_eq!(applied.gateway_transaction_id.as_deref(), Some("T1"));

    let second = store.apply_payment("pg-itest-1", update(PaymentStatus::Failed, "T2")).await.unwrap();
    assert_eq!(second, ApplyResult::AlreadySettled(applied));

    let missing = store.apply_payment("pg-itest-missing", update(PaymentStatus::Failed, "T3")).await.unwrap();
    assert_eq!(missing, ApplyResult::NotFound);
}
