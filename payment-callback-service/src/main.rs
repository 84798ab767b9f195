use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use common_observability::CallbackMetrics;
use payment_callback_service::{
    build_router, AppState, CallbackConfig, HttpStatusVerifier, MemoryOrderStore, OrderStore, PgOrderStore,
};
use sqlx::PgPool;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = CallbackConfig::from_env()?;
    info!(
        merchant_id = %config.merchant_id,
        gateway = %config.gateway_base_url,
        salt_index = config.signer.salt_index(),
        "Loaded payment callback configuration"
    );

    let orders: Arc<dyn OrderStore> = match &config.database_url {
        Some(url) => {
            let db = PgPool::connect(url).await.context("failed to connect to DATABASE_URL")?;
            Arc::new(PgOrderStore::new(db))
        }
        None => {
            warn!("DATABASE_URL not set; using in-memory order store (development only)");
            Arc::new(MemoryOrderStore::new())
        }
    };
    let verifier = Arc::new(HttpStatusVerifier::new(&config)?);
    let metrics = Arc::new(CallbackMetrics::new().context("failed to register metrics")?);

    let state = AppState {
        config: Arc::new(config),
        verifier,
        orders,
        metrics,
    };
    let app = build_router(state);

    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8090);
    let ip: std::net::IpAddr = host.parse()?;
    let addr = SocketAddr::from((ip, port));
    info!(%addr, "starting payment-callback-service");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
