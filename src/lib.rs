//! Tiendita Cart & Order Domain Service
//!
//! HTTP backend for the Tiendita mobile storefront.
//!
//! ## Features
//! - User registration and bearer-token sessions
//! - Read-only product catalog
//! - Per-user carts with merge-on-add semantics
//! - Atomic checkout into immutable orders
//! - Order status state machine with a refund sub-ledger

pub mod config;
pub mod domain;
pub mod error;
pub mod routes;
pub mod session;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: config::Config,
}
