//! Service error taxonomy and the failure half of the response envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::domain::aggregates::order::OrderError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("no valid session for this request")]
    Unauthenticated,

    #[error("cart is empty")]
    EmptyCart,

    #[error("{0}")]
    InvalidTransition(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("backend unavailable, try again later")]
    UpstreamUnavailable,
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::EmptyCart => "empty_cart",
            Self::InvalidTransition(_) => "invalid_transition",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::UpstreamUnavailable => "upstream_unavailable",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::EmptyCart => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InvalidTransition(_) | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: ErrorDetail {
                code: self.code(),
                message: self.to_string(),
            },
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound("resource"),
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                Self::Conflict("a conflicting record already exists".to_string())
            }
            _ => {
                tracing::error!(error = %err, "database failure");
                Self::UpstreamUnavailable
            }
        }
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::EmptyCart => Self::EmptyCart,
            e @ OrderError::InvalidTransition { .. } => Self::InvalidTransition(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(ApiError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::EmptyCart.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            ApiError::InvalidTransition("x".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(ApiError::NotFound("order").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::UpstreamUnavailable.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err: ApiError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.code(), "not_found");
    }

    #[tokio::test]
    async fn error_envelope_shape() {
        let resp = ApiError::EmptyCart.into_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["success"], serde_json::json!(false));
        assert_eq!(v["error"]["code"], "empty_cart");
        assert_eq!(v["error"]["message"], "cart is empty");
    }
}
