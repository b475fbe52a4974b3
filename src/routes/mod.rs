//! HTTP surface: router assembly and the success half of the response
//! envelope.

use axum::{
    routing::{get, patch, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

pub mod addresses;
pub mod auth;
pub mod cart;
pub mod orders;
pub mod products;
pub mod refunds;

/// Uniform success envelope; failures are rendered by
/// [`crate::error::ApiError`].
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope { success: true, data })
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/health",
            get(|| async { Json(serde_json::json!({"status": "healthy", "service": "tiendita-service"})) }),
        )
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/logout", post(auth::logout))
        .route("/api/v1/auth/me", get(auth::me).put(auth::update_me))
        .route("/api/v1/products", get(products::list_products))
        .route("/api/v1/products/:id", get(products::get_product))
        .route("/api/v1/addresses", get(addresses::list_addresses).post(addresses::create_address))
        .route("/api/v1/addresses/:id", get(addresses::get_address).put(addresses::update_address))
        .route("/api/v1/cart/:user_id", get(cart::get_cart))
        .route("/api/v1/cart/add", post(cart::add_item))
        .route("/api/v1/cart/remove", post(cart::remove_item))
        .route("/api/v1/cart/clear", post(cart::clear))
        .route("/api/v1/checkout", post(orders::checkout))
        .route("/api/v1/orders/user/:user_id", get(orders::list_orders))
        .route("/api/v1/orders/:id", get(orders::get_order))
        .route("/api/v1/orders/:id/status", patch(orders::set_status))
        .route("/api/v1/orders/:id/cancel", post(orders::cancel))
        .route("/api/v1/orders/:id/reorder", post(orders::reorder))
        .route("/api/v1/refunds/:order_id", get(refunds::get_refund))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_wraps_data_under_success() {
        let json = serde_json::to_value(&Envelope { success: true, data: 7 }).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "data": 7}));
    }
}
