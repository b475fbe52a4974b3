//! Registration, login/logout and profile reads.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    routes::{ok, Envelope},
    session::AuthSession,
    AppState,
};

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct UserView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

pub async fn register(
    State(s): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<Envelope<UserView>>> {
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|_| ApiError::UpstreamUnavailable)?
        .to_string();
    let user = sqlx::query_as::<_, UserView>(
        "INSERT INTO users (id, name, email, password_hash, created_at) \
         VALUES ($1, $2, $3, $4, NOW()) RETURNING id, name, email, created_at",
    )
    .bind(Uuid::now_v7())
    .bind(&req.name)
    .bind(req.email.trim().to_lowercase())
    .bind(&password_hash)
    .fetch_one(&s.db)
    .await?;
    tracing::info!(user_id = %user.id, "user registered");
    Ok(ok(user))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: Uuid,
    pub user: UserView,
}

#[derive(Debug, sqlx::FromRow)]
struct UserAuthRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

pub async fn login(
    State(s): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<Envelope<LoginResponse>>> {
    let user = sqlx::query_as::<_, UserAuthRow>(
        "SELECT id, name, email, password_hash, created_at FROM users WHERE email = $1",
    )
    .bind(req.email.trim().to_lowercase())
    .fetch_optional(&s.db)
    .await?
    .ok_or(ApiError::Unauthenticated)?;

    let parsed = PasswordHash::new(&user.password_hash).map_err(|_| ApiError::Unauthenticated)?;
    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed)
        .map_err(|_| ApiError::Unauthenticated)?;

    let token = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO sessions (token, user_id, created_at, expires_at) \
         VALUES ($1, $2, NOW(), NOW() + make_interval(hours => $3))",
    )
    .bind(token)
    .bind(user.id)
    .bind(s.config.session_ttl_hours)
    .execute(&s.db)
    .await?;
    tracing::info!(user_id = %user.id, "session opened");

    Ok(ok(LoginResponse {
        token,
        user: UserView {
            id: user.id,
            name: user.name,
            email: user.email,
            created_at: user.created_at,
        },
    }))
}

/// Ends the session and empties the user's cart, matching the client's
/// logout behaviour. Both happen in one transaction.
pub async fn logout(
    State(s): State<AppState>,
    session: AuthSession,
) -> ApiResult<Json<Envelope<serde_json::Value>>> {
    let mut tx = s.db.begin().await?;
    sqlx::query("DELETE FROM sessions WHERE token = $1")
        .bind(session.token)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(session.user_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    tracing::info!(user_id = %session.user_id, "session closed, cart vacated");
    Ok(ok(serde_json::json!({"logged_out": true})))
}

pub async fn me(
    State(s): State<AppState>,
    session: AuthSession,
) -> ApiResult<Json<Envelope<UserView>>> {
    let user =
        sqlx::query_as::<_, UserView>("SELECT id, name, email, created_at FROM users WHERE id = $1")
            .bind(session.user_id)
            .fetch_optional(&s.db)
            .await?
            .ok_or(ApiError::NotFound("user"))?;
    Ok(ok(user))
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: String,
    pub email: String,
}

pub async fn update_me(
    State(s): State<AppState>,
    session: AuthSession,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<Envelope<UserView>>> {
    let user = sqlx::query_as::<_, UserView>(
        "UPDATE users SET name = $2, email = $3 WHERE id = $1 \
         RETURNING id, name, email, created_at",
    )
    .bind(session.user_id)
    .bind(&req.name)
    .bind(req.email.trim().to_lowercase())
    .fetch_one(&s.db)
    .await?;
    tracing::info!(user_id = %user.id, "profile updated");
    Ok(ok(user))
}
