//! Account Models
//!
//! Data structures for account requests, responses, and database entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

// ============================================
// Database Entities
// ============================================

/// Account entity from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Refresh token ledger entry from database
#[derive(Debug, Clone, FromRow)]
pub struct RefreshTokenRecord {
    pub jti: Uuid,
    pub account_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshTokenRecord {
    /// Check if token is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }

    /// Check if token is revoked
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Check if token is usable for refresh
    pub fn is_valid(&self) -> bool {
        !self.is_expired() && !self.is_revoked()
    }
}

// ============================================
// Request DTOs
// ============================================

/// Registration request
///
/// Every field is optional at the deserialization layer; the registration
/// workflow reports missing required fields per field instead of rejecting
/// the body wholesale.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password2: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Validated registration data; only these fields ever reach the store
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
}

/// Login request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub username: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub password: String,
}

/// Refresh / blacklist request carrying a refresh token
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RefreshRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub refresh: String,
}

// ============================================
// Response DTOs
// ============================================

/// Account response (public account data without sensitive fields)
#[derive(Debug, Clone, Serialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            username: account.username,
            email: account.email,
            first_name: account.first_name,
            last_name: account.last_name,
        }
    }
}

/// Login response with both tokens
#[derive(Debug, Clone, Serialize)]
pub struct TokenPairResponse {
    pub access: String,
    pub refresh: String,
}

/// Refresh response with a new access token
#[derive(Debug, Clone, Serialize)]
pub struct AccessTokenResponse {
    pub access: String,
}

// ============================================
// JWT Claims
// ============================================

/// Token kind discriminator carried in the claims
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// JWT claims shared by access and refresh tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (account ID)
    pub sub: Uuid,
    /// Token kind; a token is only accepted where its kind is expected
    pub token_type: TokenKind,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// Issuer
    pub iss: String,
    /// JWT ID (unique identifier; keys the refresh token ledger)
    pub jti: Uuid,
}
