#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use common_crypto::GatewaySigner;
use common_observability::CallbackMetrics;
use httpmock::prelude::*;
use httpmock::Mock;
use payment_callback_service::{
    build_router, AppState, CallbackConfig, HttpStatusVerifier, MemoryOrderStore, OrderStore,
};
use serde_json::{json, Value};

pub const MERCHANT_ID: &str = "MERCHANTUAT";
pub const SALT_KEY: &str = "test-salt-key";
pub const SALT_INDEX: u32 = 1;
pub const ORDERS_PATH: &str = "/account/orders";

pub fn signer() -> GatewaySigner {
    GatewaySigner::new(SALT_KEY, SALT_INDEX)
}

pub fn config(gateway_base_url: &str) -> CallbackConfig {
    CallbackConfig {
        merchant_id: MERCHANT_ID.into(),
        signer: signer(),
        gateway_base_url: gateway_base_url.trim_end_matches('/').to_string(),
        gateway_timeout: Duration::from_secs(2),
        orders_path: ORDERS_PATH.into(),
        database_url: None,
    }
}

pub struct Harness {
    pub app: Router,
    pub metrics: Arc<CallbackMetrics>,
}

pub fn harness(gateway_base_url: &str, orders: Arc<dyn OrderStore>) -> Harness {
    let config = config(gateway_base_url);
    let verifier = Arc::new(HttpStatusVerifier::new(&config).expect("verifier"));
    let metrics = Arc::new(CallbackMetrics::new().expect("metrics"));
    let state = AppState {
        config: Arc::new(config),
        verifier,
        orders,
        metrics: metrics.clone(),
    };
    Harness { app: build_router(state), metrics }
}

pub async fn memory_store_with(order_ids: &[&str]) -> Arc<MemoryOrderStore> {
    let store = Arc::new(MemoryOrderStore::new());
    for id in order_ids {
        store.insert_pending(id).await;
    }
    store
}

pub fn callback_body(reference: &str, gateway_txn: &str, code: &str) -> Vec<u8> {
    json!({
        "code": code,
        "merchantId": MERCHANT_ID,
        "transactionId": gateway_txn,
        "merchantTransactionId": reference,
    })
    .to_string()
    .into_bytes()
}

pub fn callback_request(body: Vec<u8>, signature: Option<String>) -> Request<Body> {
    let mut builder = Request::builder()
        .uri("/payments/callback")
        .method("POST")
        .header("content-type", "application/json");
    if let Some(sig) = signature {
        builder = builder.header("X-VERIFY", sig);
    }
    builder.body(Body::from(body)).unwrap()
}

pub fn signed_callback(body: Vec<u8>) -> Request<Body> {
    let sig = signer().sign(&body);
    callback_request(body, Some(sig))
}

pub async fn mock_status<'a>(server: &'a MockServer, reference: &str, status: u16, body: Value) -> Mock<'a> {
    let path = format!("/pg/v1/status/{MERCHANT_ID}/{reference}");
    let expected_sig = signer().sign(path.as_bytes());
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path(path.as_str())
                .header("X-VERIFY", expected_sig.as_str())
                .header("X-MERCHANT-ID", MERCHANT_ID);
            then.status(status).json_body(body);
        })
        .await
}

pub fn success_status(gateway_txn: &str) -> Value {
    json!({
        "success": true,
        "code": "PAYMENT_SUCCESS",
        "message": "Your payment is successful.",
        "data": {"merchantId": MERCHANT_ID, "transactionId": gateway_txn, "state": "COMPLETED"}
    })
}

pub fn location<B>(resp: &Response<B>) -> String {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
