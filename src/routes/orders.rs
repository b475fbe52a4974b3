//! Checkout, order history and the order status state machine.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    domain::aggregates::cart::Cart,
    domain::aggregates::order::{Order, OrderStatus, PaymentMethod},
    domain::aggregates::refund::Refund,
    domain::value_objects::Money,
    error::{ApiError, ApiResult},
    routes::addresses::AddressRow,
    routes::cart::{load_cart, CartRow, CartView, CART_SELECT},
    routes::refunds::RefundRow,
    routes::{ok, Envelope},
    session::AuthSession,
    AppState,
};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderRow {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub status: String,
    pub payment_method: String,
    pub total: Decimal,
    pub currency: String,
    pub street: String,
    pub city: String,
    pub municipality: String,
    pub state: String,
    pub postal_code: String,
    pub phone: String,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub estimated_delivery_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItemRow {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Serialize)]
pub struct OrderDetail {
    pub order: OrderRow,
    pub items: Vec<OrderItemRow>,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub user_id: Uuid,
    pub address_id: Uuid,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order_id: Uuid,
    pub order_number: String,
    pub total: Decimal,
    pub currency: String,
}

/// Snapshots the cart into a pending order and clears the snapshotted lines.
/// Both happen in one transaction. `FOR UPDATE` only locks rows that already
/// exist, so the delete is scoped to the snapshotted product_ids: a line a
/// concurrent add inserts mid-checkout stays in the cart instead of being
/// silently swept away.
pub async fn checkout(
    State(s): State<AppState>,
    session: AuthSession,
    Json(req): Json<CheckoutRequest>,
) -> ApiResult<Json<Envelope<CheckoutResponse>>> {
    session.ensure_user(req.user_id)?;

    let address =
        sqlx::query_as::<_, AddressRow>("SELECT * FROM addresses WHERE id = $1 AND user_id = $2")
            .bind(req.address_id)
            .bind(req.user_id)
            .fetch_optional(&s.db)
            .await?
            .ok_or(ApiError::NotFound("address"))?;

    let mut tx = s.db.begin().await?;

    let locked = format!("{CART_SELECT} FOR UPDATE OF c");
    let rows: Vec<CartRow> = sqlx::query_as(&locked).bind(req.user_id).fetch_all(&mut *tx).await?;
    let snapshotted: Vec<Uuid> = rows.iter().map(|r| r.product_id).collect();
    let items = rows.into_iter().map(|r| r.into_item(&s.config.currency)).collect();
    let cart = Cart::from_items(req.user_id, items, &s.config.currency);

    let order_number = format!("ORD-{:08}", rand::random::<u32>());
    let order = Order::from_cart(
        order_number,
        &cart,
        address.into_delivery(),
        req.payment_method,
        s.config.delivery_offset_days,
    )?;

    sqlx::query(
        "INSERT INTO orders (id, order_number, user_id, status, payment_method, total, currency, \
         street, city, municipality, state, postal_code, phone, \
         created_at, estimated_delivery_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $14)",
    )
    .bind(order.id())
    .bind(order.order_number())
    .bind(order.user_id())
    .bind(order.status().as_str())
    .bind(order.payment_method().as_str())
    .bind(order.total().amount())
    .bind(order.total().currency())
    .bind(&order.delivery().street)
    .bind(&order.delivery().city)
    .bind(&order.delivery().municipality)
    .bind(&order.delivery().state)
    .bind(&order.delivery().postal_code)
    .bind(&order.delivery().phone)
    .bind(order.created_at())
    .bind(order.estimated_delivery_at())
    .execute(&mut *tx)
    .await?;

    for line in order.items() {
        sqlx::query(
            "INSERT INTO order_items (id, order_id, product_id, name, quantity, unit_price, line_total) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(Uuid::now_v7())
        .bind(order.id())
        .bind(line.product_id)
        .bind(&line.name)
        .bind(line.quantity as i32)
        .bind(line.unit_price.amount())
        .bind(line.line_total.amount())
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = ANY($2)")
        .bind(req.user_id)
        .bind(&snapshotted)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    tracing::info!(
        order_id = %order.id(),
        user_id = %req.user_id,
        total = %order.total().amount(),
        "checkout completed"
    );

    Ok(ok(CheckoutResponse {
        order_id: order.id(),
        order_number: order.order_number().to_string(),
        total: order.total().amount(),
        currency: order.total().currency().to_string(),
    }))
}

pub async fn list_orders(
    State(s): State<AppState>,
    session: AuthSession,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Envelope<Vec<OrderRow>>>> {
    session.ensure_user(user_id)?;
    let orders = sqlx::query_as::<_, OrderRow>(
        "SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(&s.db)
    .await?;
    Ok(ok(orders))
}

pub async fn get_order(
    State(s): State<AppState>,
    session: AuthSession,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Envelope<OrderDetail>>> {
    let order =
        sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(session.user_id)
            .fetch_optional(&s.db)
            .await?
            .ok_or(ApiError::NotFound("order"))?;
    let items = order_items(&s.db, id).await?;
    Ok(ok(OrderDetail { order, items }))
}

async fn order_items(db: &PgPool, order_id: Uuid) -> ApiResult<Vec<OrderItemRow>> {
    Ok(sqlx::query_as::<_, OrderItemRow>(
        "SELECT product_id, name, quantity, unit_price, line_total \
         FROM order_items WHERE order_id = $1",
    )
    .bind(order_id)
    .fetch_all(db)
    .await?)
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: OrderStatus,
}

/// Advances the state machine one legal step. A move to `cancelled` runs
/// through the cancel path and opens the refund.
pub async fn set_status(
    State(s): State<AppState>,
    session: AuthSession,
    Path(id): Path<Uuid>,
    Json(req): Json<SetStatusRequest>,
) -> ApiResult<Json<Envelope<OrderRow>>> {
    let row: (String,) =
        sqlx::query_as("SELECT status FROM orders WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(session.user_id)
            .fetch_optional(&s.db)
            .await?
            .ok_or(ApiError::NotFound("order"))?;
    let current = OrderStatus::parse(&row.0)
        .ok_or_else(|| ApiError::InvalidTransition(format!("order has unknown status {}", row.0)))?;
    let next = current.transition(req.status)?;

    if next == OrderStatus::Cancelled {
        cancel_order(&s.db, id, session.user_id).await?;
    } else {
        // Guarded against concurrent transitions: the row must still carry
        // the status we validated against.
        let updated = sqlx::query(
            "UPDATE orders SET status = $3, updated_at = NOW() WHERE id = $1 AND status = $2",
        )
        .bind(id)
        .bind(current.as_str())
        .bind(next.as_str())
        .execute(&s.db)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(ApiError::Conflict("order status changed concurrently".to_string()));
        }
        tracing::info!(order_id = %id, from = %current, to = %next, "order status advanced");
    }

    let order =
        sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(session.user_id)
            .fetch_one(&s.db)
            .await?;
    Ok(ok(order))
}

pub async fn cancel(
    State(s): State<AppState>,
    session: AuthSession,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Envelope<RefundRow>>> {
    let refund = cancel_order(&s.db, id, session.user_id).await?;
    Ok(ok(refund))
}

/// Cancels the order and opens its refund in one transaction. The guarded
/// UPDATE makes the whole operation race-safe: only one caller can move the
/// order out of a cancellable status, so the refund is inserted exactly once.
async fn cancel_order(db: &PgPool, order_id: Uuid, user_id: Uuid) -> ApiResult<RefundRow> {
    let mut tx = db.begin().await?;

    let updated: Option<(Decimal, String)> = sqlx::query_as(
        "UPDATE orders SET status = 'cancelled', updated_at = NOW() \
         WHERE id = $1 AND user_id = $2 AND status IN ('pending', 'processed', 'shipped') \
         RETURNING total, currency",
    )
    .bind(order_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some((total, currency)) = updated else {
        let existing: Option<(String,)> =
            sqlx::query_as("SELECT status FROM orders WHERE id = $1 AND user_id = $2")
                .bind(order_id)
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
        return Err(match existing {
            None => ApiError::NotFound("order"),
            Some((status,)) => {
                ApiError::InvalidTransition(format!("order in status {status} cannot be cancelled"))
            }
        });
    };

    let refund = Refund::for_order(order_id, Money::new(total, &currency));
    let row = sqlx::query_as::<_, RefundRow>(
        "INSERT INTO refunds (id, order_id, amount, currency, status, cancelled_at) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(refund.order_id)
    .bind(refund.amount.amount())
    .bind(refund.amount.currency())
    .bind(refund.status.as_str())
    .bind(refund.cancelled_at)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::info!(order_id = %order_id, amount = %row.amount, "order cancelled, refund opened");
    Ok(row)
}

/// Copies a past order's lines back into the cart at current catalog prices,
/// merging with whatever is already there. Archived products are skipped.
pub async fn reorder(
    State(s): State<AppState>,
    session: AuthSession,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Envelope<CartView>>> {
    sqlx::query_as::<_, (Uuid,)>("SELECT id FROM orders WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(session.user_id)
        .fetch_optional(&s.db)
        .await?
        .ok_or(ApiError::NotFound("order"))?;

    sqlx::query(
        "INSERT INTO cart_items (user_id, product_id, quantity, unit_price, created_at) \
         SELECT $1, oi.product_id, oi.quantity, p.price, NOW() \
         FROM order_items oi JOIN products p ON p.id = oi.product_id AND p.status = 'active' \
         WHERE oi.order_id = $2 \
         ON CONFLICT (user_id, product_id) DO UPDATE \
         SET quantity = cart_items.quantity + EXCLUDED.quantity, unit_price = EXCLUDED.unit_price",
    )
    .bind(session.user_id)
    .bind(id)
    .execute(&s.db)
    .await?;

    let cart = load_cart(&s.db, session.user_id, &s.config.currency).await?;
    Ok(ok(CartView::from_cart(&cart)))
}
