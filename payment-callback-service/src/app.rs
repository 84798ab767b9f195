use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header::{ACCEPT, CONTENT_TYPE}, HeaderValue, Method, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::{routing::{get, post}, Router};
use common_observability::CallbackMetrics;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

use crate::config::CallbackConfig;
use crate::gateway::StatusVerifier;
use crate::order_handlers::get_order_payment;
use crate::repo::OrderStore;
use crate::webhook::handle_payment_callback;

pub const SERVICE_NAME: &str = "payment-callback-service";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<CallbackConfig>,
    pub verifier: Arc<dyn StatusVerifier>,
    pub orders: Arc<dyn OrderStore>,
    pub metrics: Arc<CallbackMetrics>,
}

pub async fn health() -> &'static str { "ok" }

async fn metrics_endpoint(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(text) => (
            StatusCode::OK,
            [(CONTENT_TYPE, HeaderValue::from_static("text/plain; version=0.0.4"))],
            text,
        )
            .into_response(),
        Err(err) => {
            warn!(error = %err, "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn http_error_metrics(State(state): State<AppState>, req: Request<Body>, next: Next) -> Response {
    let resp = next.run(req).await;
    let status = resp.status();
    if status.as_u16() >= 400 {
        let code = resp.headers().get("X-Error-Code").and_then(|v| v.to_str().ok()).unwrap_or("unknown");
        state.metrics.record_http_error(SERVICE_NAME, code, status.as_u16());
    }
    resp
}

pub fn build_router(state: AppState) -> Router {
    let allowed_origins = [
        "http://localhost:3000",
        "http://localhost:3001",
        "http://localhost:5173",
    ];
    // Only the read endpoint is called from browsers; the callback is server-to-server.
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(
            allowed_origins.iter().filter_map(|o| o.parse::<HeaderValue>().ok()).collect::<Vec<_>>(),
        ))
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([ACCEPT, CONTENT_TYPE]);

    Router::new()
        .route("/healthz", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/payments/callback", post(handle_payment_callback))
        .route("/orders/:order_id/payment", get(get_order_payment))
        .layer(middleware::from_fn_with_state(state.clone(), http_error_metrics))
        .layer(cors)
        .with_state(state)
}
