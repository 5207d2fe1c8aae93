//! Service Configuration
//!
//! All configuration values are loaded from environment variables once at
//! startup and carried in application state. Nothing reads the environment
//! after boot.

use crate::error::ApiError;
use std::env;

/// Service configuration loaded from environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HS256 signing key for JWTs (from SECRET_KEY env var)
    pub secret_key: String,

    /// Debug mode; loosens secret and host checks (from DEBUG env var)
    pub debug: bool,

    /// Host-header allowlist, "*" allows any (from ALLOWED_HOSTS env var)
    pub allowed_hosts: Vec<String>,

    /// Trusted CORS origins, "*" allows any (from CORS_ALLOWED_ORIGINS env var)
    pub cors_allowed_origins: Vec<String>,

    /// Access token expiration in seconds (from ACCESS_TOKEN_LIFETIME env var)
    pub access_token_lifetime: i64,

    /// Refresh token expiration in seconds (from REFRESH_TOKEN_LIFETIME env var)
    pub refresh_token_lifetime: i64,

    /// JWT issuer claim (from JWT_ISSUER env var)
    pub jwt_issuer: String,

    /// Minimum password length (from PASSWORD_MIN_LENGTH env var)
    pub password_min_length: usize,

    /// Postgres connection string (from DATABASE_URL env var)
    pub database_url: String,

    /// Listen address (from BIND_ADDR env var)
    pub bind_addr: String,
}

/// Development fallback for SECRET_KEY; rejected by validate() outside debug
const DEV_SECRET_KEY: &str = "dev-secret-change-me";

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            secret_key: env::var("SECRET_KEY").unwrap_or_else(|_| DEV_SECRET_KEY.to_string()),

            debug: env::var("DEBUG")
                .ok()
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(true),

            allowed_hosts: env::var("ALLOWED_HOSTS")
                .map(|v| split_csv(&v))
                .unwrap_or_else(|_| vec!["*".to_string()]),

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .map(|v| split_csv(&v))
                .unwrap_or_else(|_| vec!["*".to_string()]),

            access_token_lifetime: env::var("ACCESS_TOKEN_LIFETIME")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600), // 60 minutes default

            refresh_token_lifetime: env::var("REFRESH_TOKEN_LIFETIME")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(604800), // 7 days default

            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "primejourney".to_string()),

            password_min_length: env::var("PASSWORD_MIN_LENGTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8),

            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/primejourney".to_string()),

            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string()),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ApiError> {
        if !self.debug {
            if self.secret_key == DEV_SECRET_KEY {
                return Err(ApiError::Config(
                    "SECRET_KEY must be set when DEBUG is false".to_string(),
                ));
            }

            if self.secret_key.len() < 32 {
                return Err(ApiError::Config(
                    "SECRET_KEY must be at least 32 characters".to_string(),
                ));
            }
        }

        if self.access_token_lifetime <= 0 {
            return Err(ApiError::Config(
                "ACCESS_TOKEN_LIFETIME must be positive".to_string(),
            ));
        }

        if self.refresh_token_lifetime <= self.access_token_lifetime {
            return Err(ApiError::Config(
                "REFRESH_TOKEN_LIFETIME must be greater than ACCESS_TOKEN_LIFETIME".to_string(),
            ));
        }

        if self.password_min_length < 8 {
            return Err(ApiError::Config(
                "PASSWORD_MIN_LENGTH must be at least 8".to_string(),
            ));
        }

        if self.allowed_hosts.is_empty() {
            return Err(ApiError::Config(
                "ALLOWED_HOSTS must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Split a comma-separated env value, dropping empty segments
fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AppConfig {
        AppConfig {
            secret_key: "a".repeat(32),
            debug: false,
            allowed_hosts: vec!["*".to_string()],
            cors_allowed_origins: vec!["*".to_string()],
            access_token_lifetime: 3600,
            refresh_token_lifetime: 604800,
            jwt_issuer: "test".to_string(),
            password_min_length: 8,
            database_url: "postgres://localhost/test".to_string(),
            bind_addr: "127.0.0.1:8000".to_string(),
        }
    }

    #[test]
    fn test_config_validation() {
        let config = test_config();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_short_secret() {
        let config = AppConfig {
            secret_key: "short".to_string(),
            ..test_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_dev_secret_allowed_in_debug() {
        let config = AppConfig {
            secret_key: DEV_SECRET_KEY.to_string(),
            debug: true,
            ..test_config()
        };
        assert!(config.validate().is_ok());

        let config = AppConfig {
            secret_key: DEV_SECRET_KEY.to_string(),
            debug: false,
            ..test_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_inverted_lifetimes() {
        let config = AppConfig {
            access_token_lifetime: 604800,
            refresh_token_lifetime: 3600,
            ..test_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_split_csv() {
        assert_eq!(split_csv("a,b , c"), vec!["a", "b", "c"]);
        assert_eq!(split_csv("*"), vec!["*"]);
        assert!(split_csv("").is_empty());
    }
}
