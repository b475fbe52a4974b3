//! Bearer-token session extraction.
//!
//! Every cart/order/address handler takes an [`AuthSession`]; there is no
//! ambient "current user". Routes that carry a `user_id` additionally check
//! it against the session user.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use uuid::Uuid;

use crate::{error::ApiError, AppState};

#[derive(Debug, Clone, Copy)]
pub struct AuthSession {
    pub user_id: Uuid,
    pub token: Uuid,
}

impl AuthSession {
    /// Fails with `Unauthenticated` when the session user is not the user the
    /// route claims to act for.
    pub fn ensure_user(&self, user_id: Uuid) -> Result<(), ApiError> {
        if self.user_id == user_id {
            Ok(())
        } else {
            Err(ApiError::Unauthenticated)
        }
    }
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
}

#[async_trait]
impl FromRequestParts<AppState> for AuthSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(ApiError::Unauthenticated)?;
        let row: Option<(Uuid,)> =
            sqlx::query_as("SELECT user_id FROM sessions WHERE token = $1 AND expires_at > NOW()")
                .bind(token)
                .fetch_optional(&state.db)
                .await?;
        let (user_id,) = row.ok_or(ApiError::Unauthenticated)?;
        Ok(Self { user_id, token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_parses_well_formed_header() {
        let token = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        assert_eq!(bearer_token(&headers), Some(token));
    }

    #[test]
    fn bearer_token_rejects_missing_or_malformed_headers() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer not-a-uuid"));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn ensure_user_rejects_other_users() {
        let session = AuthSession { user_id: Uuid::new_v4(), token: Uuid::new_v4() };
        assert!(session.ensure_user(session.user_id).is_ok());
        assert!(session.ensure_user(Uuid::new_v4()).is_err());
    }
}
