//! Per-user address book. Orders copy delivery fields off an address at
//! checkout, so edits here never affect existing orders.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    domain::aggregates::order::Delivery,
    error::{ApiError, ApiResult},
    routes::{ok, Envelope},
    session::AuthSession,
    AppState,
};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AddressRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub street: String,
    pub city: String,
    pub municipality: String,
    pub state: String,
    pub postal_code: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

impl AddressRow {
    pub fn into_delivery(self) -> Delivery {
        Delivery {
            street: self.street,
            city: self.city,
            municipality: self.municipality,
            state: self.state,
            postal_code: self.postal_code,
            phone: self.phone,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AddressRequest {
    pub street: String,
    pub city: String,
    pub municipality: String,
    pub state: String,
    pub postal_code: String,
    pub phone: String,
}

pub async fn list_addresses(
    State(s): State<AppState>,
    session: AuthSession,
) -> ApiResult<Json<Envelope<Vec<AddressRow>>>> {
    let addresses = sqlx::query_as::<_, AddressRow>(
        "SELECT * FROM addresses WHERE user_id = $1 ORDER BY created_at",
    )
    .bind(session.user_id)
    .fetch_all(&s.db)
    .await?;
    Ok(ok(addresses))
}

pub async fn create_address(
    State(s): State<AppState>,
    session: AuthSession,
    Json(req): Json<AddressRequest>,
) -> ApiResult<Json<Envelope<AddressRow>>> {
    let address = sqlx::query_as::<_, AddressRow>(
        "INSERT INTO addresses (id, user_id, street, city, municipality, state, postal_code, phone, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(session.user_id)
    .bind(&req.street)
    .bind(&req.city)
    .bind(&req.municipality)
    .bind(&req.state)
    .bind(&req.postal_code)
    .bind(&req.phone)
    .fetch_one(&s.db)
    .await?;
    Ok(ok(address))
}

pub async fn get_address(
    State(s): State<AppState>,
    session: AuthSession,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Envelope<AddressRow>>> {
    let address =
        sqlx::query_as::<_, AddressRow>("SELECT * FROM addresses WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(session.user_id)
            .fetch_optional(&s.db)
            .await?
            .ok_or(ApiError::NotFound("address"))?;
    Ok(ok(address))
}

pub async fn update_address(
    State(s): State<AppState>,
    session: AuthSession,
    Path(id): Path<Uuid>,
    Json(req): Json<AddressRequest>,
) -> ApiResult<Json<Envelope<AddressRow>>> {
    let address = sqlx::query_as::<_, AddressRow>(
        "UPDATE addresses SET street = $3, city = $4, municipality = $5, state = $6, \
         postal_code = $7, phone = $8 WHERE id = $1 AND user_id = $2 RETURNING *",
    )
    .bind(id)
    .bind(session.user_id)
    .bind(&req.street)
    .bind(&req.city)
    .bind(&req.municipality)
    .bind(&req.state)
    .bind(&req.postal_code)
    .bind(&req.phone)
    .fetch_optional(&s.db)
    .await?
    .ok_or(ApiError::NotFound("address"))?;
    Ok(ok(address))
}
