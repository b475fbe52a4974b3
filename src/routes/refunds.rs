//! Refund reads. A refund exists only for cancelled orders; the detail view
//! carries the cancelled order's delivery snapshot and line items, which is
//! everything the client's refund screen renders.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    routes::orders::{OrderItemRow, OrderRow},
    routes::{ok, Envelope},
    session::AuthSession,
    AppState,
};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RefundRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub status: String,
    pub cancelled_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct RefundDetail {
    pub refund: RefundRow,
    pub order: OrderRow,
    pub items: Vec<OrderItemRow>,
}

pub async fn get_refund(
    State(s): State<AppState>,
    session: AuthSession,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Json<Envelope<RefundDetail>>> {
    let refund = sqlx::query_as::<_, RefundRow>(
        "SELECT r.* FROM refunds r JOIN orders o ON o.id = r.order_id \
         WHERE r.order_id = $1 AND o.user_id = $2",
    )
    .bind(order_id)
    .bind(session.user_id)
    .fetch_optional(&s.db)
    .await?
    .ok_or(ApiError::NotFound("refund"))?;

    let order =
        sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1 AND user_id = $2")
            .bind(order_id)
            .bind(session.user_id)
            .fetch_one(&s.db)
            .await?;
    let items = sqlx::query_as::<_, OrderItemRow>(
        "SELECT product_id, name, quantity, unit_price, line_total \
         FROM order_items WHERE order_id = $1",
    )
    .bind(order_id)
    .fetch_all(&s.db)
    .await?;

    Ok(ok(RefundDetail { refund, order, items }))
}
