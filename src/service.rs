//! Account Service
//!
//! Core account logic: login, token issuance and verification, refresh,
//! revocation, and account lookup. Registration is delegated to the
//! registration workflow.
//!
//! Refresh tokens are tracked in the refresh_tokens ledger by their jti
//! claim. A refresh token is honored only while its row exists, is
//! unexpired, and carries no revocation timestamp. Refreshing does not
//! rotate the token.

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::models::{
    AccessTokenResponse, Account, LoginRequest, RefreshTokenRecord, RegisterRequest, TokenClaims,
    TokenKind, TokenPairResponse,
};
use crate::password::{self, PasswordPolicy};
use crate::registration;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;
use uuid::Uuid;

/// Account service
pub struct AuthService {
    db: PgPool,
    config: AppConfig,
    policy: PasswordPolicy,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthService {
    /// Create a new account service
    pub fn new(db: PgPool, config: AppConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret_key.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret_key.as_bytes());
        let policy = PasswordPolicy::new(config.password_min_length);

        Self {
            db,
            config,
            policy,
            encoding_key,
            decoding_key,
        }
    }

    /// Get reference to the database pool
    pub fn db(&self) -> &PgPool {
        &self.db
    }

    /// Get reference to config
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    // ============================================
    // Registration
    // ============================================

    /// Register a new account
    pub async fn register(&self, req: RegisterRequest) -> Result<Account, ApiError> {
        registration::register(&self.db, &self.policy, req).await
    }

    // ============================================
    // Login
    // ============================================

    /// Verify credentials and issue a token pair
    pub async fn login(&self, req: LoginRequest) -> Result<TokenPairResponse, ApiError> {
        let account: Option<Account> = sqlx::query_as("SELECT * FROM accounts WHERE username = $1")
            .bind(&req.username)
            .fetch_optional(&self.db)
            .await?;

        let account = account.ok_or(ApiError::InvalidCredentials)?;

        if !password::verify_password(&req.password, &account.password_hash)? {
            return Err(ApiError::InvalidCredentials);
        }

        let access = self.generate_access_token(account.id)?;
        let refresh = self.generate_refresh_token(account.id).await?;

        tracing::info!(account_id = %account.id, "Login succeeded");

        Ok(TokenPairResponse { access, refresh })
    }

    // ============================================
    // Token Generation / Verification
    // ============================================

    /// Generate a short-lived access token
    pub fn generate_access_token(&self, account_id: Uuid) -> Result<String, ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.config.access_token_lifetime);

        let claims = TokenClaims {
            sub: account_id,
            token_type: TokenKind::Access,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            jti: Uuid::new_v4(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Generate a refresh token and record it in the ledger
    pub async fn generate_refresh_token(&self, account_id: Uuid) -> Result<String, ApiError> {
        let jti = Uuid::new_v4();
        let now = Utc::now();
        let exp = now + Duration::seconds(self.config.refresh_token_lifetime);

        sqlx::query("INSERT INTO refresh_tokens (jti, account_id, expires_at) VALUES ($1, $2, $3)")
            .bind(jti)
            .bind(account_id)
            .bind(exp)
            .execute(&self.db)
            .await?;

        let claims = TokenClaims {
            sub: account_id,
            token_type: TokenKind::Refresh,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            jti,
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Verify a token's signature, expiry, issuer, and kind
    pub fn verify_token(&self, token: &str, expected: TokenKind) -> Result<TokenClaims, ApiError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.jwt_issuer]);

        let token_data = decode::<TokenClaims>(token, &self.decoding_key, &validation)?;

        if token_data.claims.token_type != expected {
            return Err(ApiError::InvalidToken);
        }

        Ok(token_data.claims)
    }

    // ============================================
    // Token Refresh / Revocation
    // ============================================

    /// Exchange a refresh token for a new access token
    pub async fn refresh(&self, refresh_token: &str) -> Result<AccessTokenResponse, ApiError> {
        let claims = self.verify_token(refresh_token, TokenKind::Refresh)?;

        let record: Option<RefreshTokenRecord> =
            sqlx::query_as("SELECT * FROM refresh_tokens WHERE jti = $1")
                .bind(claims.jti)
                .fetch_optional(&self.db)
                .await?;

        let record = record.ok_or(ApiError::InvalidToken)?;

        if record.is_revoked() {
            tracing::warn!(account_id = %record.account_id, jti = %record.jti, "Revoked refresh token presented");
            return Err(ApiError::TokenRevoked);
        }

        if record.is_expired() {
            return Err(ApiError::InvalidToken);
        }

        let access = self.generate_access_token(record.account_id)?;
        Ok(AccessTokenResponse { access })
    }

    /// Revoke a refresh token so it can never be exchanged again
    ///
    /// Revoking an already-revoked token is a no-op.
    pub async fn blacklist(&self, refresh_token: &str) -> Result<(), ApiError> {
        let claims = self.verify_token(refresh_token, TokenKind::Refresh)?;

        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = NOW() WHERE jti = $1 AND revoked_at IS NULL",
        )
        .bind(claims.jti)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            tracing::debug!(jti = %claims.jti, "Refresh token was already revoked or unknown");
        } else {
            tracing::info!(account_id = %claims.sub, jti = %claims.jti, "Refresh token revoked");
        }

        Ok(())
    }

    // ============================================
    // Account Lookup
    // ============================================

    /// Get account by ID
    pub async fn get_account(&self, account_id: Uuid) -> Result<Option<Account>, ApiError> {
        let account = sqlx::query_as("SELECT * FROM accounts WHERE id = $1")
            .bind(account_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(account)
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AppConfig {
        AppConfig {
            secret_key: "0123456789abcdef0123456789abcdef".to_string(),
            debug: false,
            allowed_hosts: vec!["*".to_string()],
            cors_allowed_origins: vec!["*".to_string()],
            access_token_lifetime: 3600,
            refresh_token_lifetime: 604800,
            jwt_issuer: "primejourney".to_string(),
            password_min_length: 8,
            database_url: "postgres://localhost/test".to_string(),
            bind_addr: "127.0.0.1:8000".to_string(),
        }
    }

    fn test_service() -> AuthService {
        let db = PgPool::connect_lazy(&test_config().database_url).unwrap();
        AuthService::new(db, test_config())
    }

    fn encode_claims(claims: &TokenClaims, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_access_token_roundtrip() {
        let service = test_service();
        let account_id = Uuid::new_v4();

        let token = service.generate_access_token(account_id).unwrap();
        let claims = service.verify_token(&token, TokenKind::Access).unwrap();

        assert_eq!(claims.sub, account_id);
        assert_eq!(claims.token_type, TokenKind::Access);
        assert_eq!(claims.iss, "primejourney");
        assert!(claims.exp > claims.iat);
    }

    #[tokio::test]
    async fn test_access_token_rejected_where_refresh_expected() {
        let service = test_service();

        let token = service.generate_access_token(Uuid::new_v4()).unwrap();
        let err = service.verify_token(&token, TokenKind::Refresh).unwrap_err();

        assert!(matches!(err, ApiError::InvalidToken));
    }

    #[tokio::test]
    async fn test_refresh_token_kind_accepted() {
        let service = test_service();
        let now = Utc::now().timestamp();

        let claims = TokenClaims {
            sub: Uuid::new_v4(),
            token_type: TokenKind::Refresh,
            iat: now,
            exp: now + 600,
            iss: "primejourney".to_string(),
            jti: Uuid::new_v4(),
        };
        let token = encode_claims(&claims, &test_config().secret_key);

        assert!(service.verify_token(&token, TokenKind::Refresh).is_ok());
        assert!(service.verify_token(&token, TokenKind::Access).is_err());
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let service = test_service();
        let now = Utc::now().timestamp();

        let claims = TokenClaims {
            sub: Uuid::new_v4(),
            token_type: TokenKind::Access,
            iat: now - 7200,
            exp: now - 3600,
            iss: "primejourney".to_string(),
            jti: Uuid::new_v4(),
        };
        let token = encode_claims(&claims, &test_config().secret_key);

        assert!(service.verify_token(&token, TokenKind::Access).is_err());
    }

    #[tokio::test]
    async fn test_wrong_issuer_rejected() {
        let service = test_service();
        let now = Utc::now().timestamp();

        let claims = TokenClaims {
            sub: Uuid::new_v4(),
            token_type: TokenKind::Access,
            iat: now,
            exp: now + 600,
            iss: "someone-else".to_string(),
            jti: Uuid::new_v4(),
        };
        let token = encode_claims(&claims, &test_config().secret_key);

        assert!(service.verify_token(&token, TokenKind::Access).is_err());
    }

    #[tokio::test]
    async fn test_foreign_signature_rejected() {
        let service = test_service();
        let now = Utc::now().timestamp();

        let claims = TokenClaims {
            sub: Uuid::new_v4(),
            token_type: TokenKind::Access,
            iat: now,
            exp: now + 600,
            iss: "primejourney".to_string(),
            jti: Uuid::new_v4(),
        };
        let token = encode_claims(&claims, "another-secret-another-secret-xx");

        assert!(service.verify_token(&token, TokenKind::Access).is_err());
    }

    #[tokio::test]
    async fn test_garbage_token_rejected() {
        let service = test_service();

        assert!(service
            .verify_token("not.a.token", TokenKind::Access)
            .is_err());
        assert!(service.verify_token("", TokenKind::Access).is_err());
    }

    // ============================================
    // Store-Backed Tests
    // ============================================

    /// Connect to the database named by TEST_DATABASE_URL, or None to skip
    async fn store_pool() -> Option<PgPool> {
        let url = std::env::var("TEST_DATABASE_URL").ok()?;
        let pool = PgPool::connect(&url).await.ok()?;
        crate::db::run_migrations(&pool).await.ok()?;
        Some(pool)
    }

    #[tokio::test]
    async fn test_blacklisted_token_cannot_refresh() {
        let pool = match store_pool().await {
            Some(pool) => pool,
            None => return,
        };
        let service = AuthService::new(pool, test_config());
        let tag = Uuid::new_v4().simple().to_string();

        let account = service
            .register(RegisterRequest {
                username: Some(format!("revoke{}", tag)),
                email: Some(format!("revoke-{}@example.com", tag)),
                password: Some("Tr0ub4dor&3".to_string()),
                password2: Some("Tr0ub4dor&3".to_string()),
                first_name: None,
                last_name: None,
            })
            .await
            .unwrap();

        let refresh = service.generate_refresh_token(account.id).await.unwrap();
        assert!(service.refresh(&refresh).await.is_ok());

        service.blacklist(&refresh).await.unwrap();

        let err = service.refresh(&refresh).await.unwrap_err();
        assert!(matches!(err, ApiError::TokenRevoked));

        // Revoking again stays acknowledged
        assert!(service.blacklist(&refresh).await.is_ok());
    }
}
