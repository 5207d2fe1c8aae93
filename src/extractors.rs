//! Request Extractors
//!
//! Axum extractors for values established earlier in the request pipeline.
//! Token verification happens in the auth middleware; extractors only read
//! what it left in the request extensions.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::TokenClaims;

/// Authenticated caller established by the auth middleware
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
}

impl AuthUser {
    /// Create from verified JWT claims
    pub fn from_claims(claims: &TokenClaims) -> Self {
        Self { id: claims.sub }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TokenClaims>()
            .map(AuthUser::from_claims)
            .ok_or(ApiError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TokenKind;
    use axum::http::Request;

    fn request_parts() -> Parts {
        Request::builder().body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn test_missing_claims_rejects() {
        let mut parts = request_parts();

        let result = AuthUser::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(ApiError::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_claims_in_extensions_extract() {
        let account_id = Uuid::new_v4();
        let claims = TokenClaims {
            sub: account_id,
            token_type: TokenKind::Access,
            iat: 0,
            exp: i64::MAX,
            iss: "test".to_string(),
            jti: Uuid::new_v4(),
        };

        let mut parts = request_parts();
        parts.extensions.insert(claims);

        let user = AuthUser::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(user.id, account_id);
    }
}
