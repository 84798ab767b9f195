pub mod app;
pub mod config;
pub mod gateway;
pub mod order_handlers;
pub mod reference;
pub mod repo;
pub mod webhook;

pub use app::{build_router, AppState};
pub use config::CallbackConfig;
pub use gateway::{HttpStatusVerifier, StatusCheck, StatusVerifier};
pub use reference::TransactionReference;
pub use repo::{MemoryOrderStore, OrderStore, PaymentStatus, PgOrderStore};
