//! Read-only product catalog.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    routes::{ok, Envelope},
    AppState,
};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub currency: String,
    pub image_url: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
}

// Computed in i64 so a hostile ?page= cannot overflow u32 arithmetic.
fn page_offset(page: u32, per_page: u32) -> i64 {
    (i64::from(page) - 1) * i64::from(per_page)
}

pub async fn list_products(
    State(s): State<AppState>,
    Query(p): Query<ListParams>,
) -> ApiResult<Json<Envelope<Paginated<ProductRow>>>> {
    let page = p.page.unwrap_or(1).max(1);
    let per_page = p.per_page.unwrap_or(20).min(100);
    let products = sqlx::query_as::<_, ProductRow>(
        "SELECT * FROM products WHERE status = 'active' \
         AND ($1::text IS NULL OR name ILIKE '%' || $1 || '%') \
         ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(&p.search)
    .bind(i64::from(per_page))
    .bind(page_offset(page, per_page))
    .fetch_all(&s.db)
    .await?;
    let total: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM products WHERE status = 'active' \
         AND ($1::text IS NULL OR name ILIKE '%' || $1 || '%')",
    )
    .bind(&p.search)
    .fetch_one(&s.db)
    .await?;
    Ok(ok(Paginated { data: products, total: total.0, page }))
}

pub async fn get_product(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Envelope<ProductRow>>> {
    let product = sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(&s.db)
        .await?
        .ok_or(ApiError::NotFound("product"))?;
    Ok(ok(product))
}
