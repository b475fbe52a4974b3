//! Cart endpoints.
//!
//! Every mutation answers with the full refreshed cart, matching the client's
//! reload-after-mutation behaviour. Per-user serialization of concurrent adds
//! comes from the single-statement upsert, so rapid double-taps never lose an
//! increment.

use axum::{
    extract::{Path, State},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::{
    domain::aggregates::cart::{Cart, CartItem},
    domain::value_objects::Money,
    error::{ApiError, ApiResult},
    routes::{ok, Envelope},
    session::AuthSession,
    AppState,
};

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct CartRow {
    pub product_id: Uuid,
    pub name: String,
    pub image_url: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl CartRow {
    pub(crate) fn into_item(self, currency: &str) -> CartItem {
        CartItem {
            product_id: self.product_id,
            name: self.name,
            image_url: self.image_url,
            quantity: u32::try_from(self.quantity).unwrap_or(1),
            unit_price: Money::new(self.unit_price, currency),
        }
    }
}

pub(crate) const CART_SELECT: &str = "SELECT c.product_id, p.name, p.image_url, c.quantity, c.unit_price \
     FROM cart_items c JOIN products p ON p.id = c.product_id \
     WHERE c.user_id = $1 ORDER BY c.created_at";

pub(crate) async fn load_cart<'e, E>(db: E, user_id: Uuid, currency: &str) -> ApiResult<Cart>
where
    E: PgExecutor<'e>,
{
    let rows: Vec<CartRow> = sqlx::query_as(CART_SELECT).bind(user_id).fetch_all(db).await?;
    let items = rows.into_iter().map(|r| r.into_item(currency)).collect();
    Ok(Cart::from_items(user_id, items, currency))
}

#[derive(Debug, Serialize)]
pub struct CartItemView {
    pub product_id: Uuid,
    pub name: String,
    pub image_url: Option<String>,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub total: Decimal,
    pub currency: String,
}

impl CartView {
    pub(crate) fn from_cart(cart: &Cart) -> Self {
        Self {
            items: cart
                .items()
                .iter()
                .map(|i| CartItemView {
                    product_id: i.product_id,
                    name: i.name.clone(),
                    image_url: i.image_url.clone(),
                    quantity: i.quantity,
                    unit_price: i.unit_price.amount(),
                    line_total: i.line_total().amount(),
                })
                .collect(),
            total: cart.total().amount(),
            currency: cart.currency().to_string(),
        }
    }
}

pub async fn get_cart(
    State(s): State<AppState>,
    session: AuthSession,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Envelope<CartView>>> {
    session.ensure_user(user_id)?;
    let cart = load_cart(&s.db, user_id, &s.config.currency).await?;
    Ok(ok(CartView::from_cart(&cart)))
}

#[derive(Debug, Deserialize)]
pub struct CartMutation {
    pub user_id: Uuid,
    pub product_id: Uuid,
}

/// Each call adds exactly one unit: an existing line is incremented, a new
/// line starts at quantity 1 with the product's current price snapshotted.
pub async fn add_item(
    State(s): State<AppState>,
    session: AuthSession,
    Json(req): Json<CartMutation>,
) -> ApiResult<Json<Envelope<CartView>>> {
    session.ensure_user(req.user_id)?;
    let price: (Decimal,) =
        sqlx::query_as("SELECT price FROM products WHERE id = $1 AND status = 'active'")
            .bind(req.product_id)
            .fetch_optional(&s.db)
            .await?
            .ok_or(ApiError::NotFound("product"))?;
    sqlx::query(
        "INSERT INTO cart_items (user_id, product_id, quantity, unit_price, created_at) \
         VALUES ($1, $2, 1, $3, NOW()) \
         ON CONFLICT (user_id, product_id) DO UPDATE SET quantity = cart_items.quantity + 1",
    )
    .bind(req.user_id)
    .bind(req.product_id)
    .bind(price.0)
    .execute(&s.db)
    .await?;
    let cart = load_cart(&s.db, req.user_id, &s.config.currency).await?;
    Ok(ok(CartView::from_cart(&cart)))
}

/// Deletes the whole line. Removing an absent product succeeds silently.
pub async fn remove_item(
    State(s): State<AppState>,
    session: AuthSession,
    Json(req): Json<CartMutation>,
) -> ApiResult<Json<Envelope<CartView>>> {
    session.ensure_user(req.user_id)?;
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
        .bind(req.user_id)
        .bind(req.product_id)
        .execute(&s.db)
        .await?;
    let cart = load_cart(&s.db, req.user_id, &s.config.currency).await?;
    Ok(ok(CartView::from_cart(&cart)))
}

#[derive(Debug, Deserialize)]
pub struct ClearRequest {
    pub user_id: Uuid,
}

pub async fn clear(
    State(s): State<AppState>,
    session: AuthSession,
    Json(req): Json<ClearRequest>,
) -> ApiResult<Json<Envelope<CartView>>> {
    session.ensure_user(req.user_id)?;
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(req.user_id)
        .execute(&s.db)
        .await?;
    let cart = load_cart(&s.db, req.user_id, &s.config.currency).await?;
    Ok(ok(CartView::from_cart(&cart)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cart_view_exposes_line_and_cart_totals() {
        let row = CartRow {
            product_id: Uuid::new_v4(),
            name: "Sombrero de palma".into(),
            image_url: Some("/img/sombrero.jpg".into()),
            quantity: 3,
            unit_price: Decimal::new(12550, 2), // 125.50
        };
        let cart = Cart::from_items(Uuid::new_v4(), vec![row.into_item("MXN")], "MXN");
        let view = CartView::from_cart(&cart);
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].line_total, Decimal::new(37650, 2));
        assert_eq!(view.total, Decimal::new(37650, 2));
        assert_eq!(view.currency, "MXN");
    }
}
