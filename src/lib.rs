//! PrimeJourney Accounts
//!
//! Account backend for the PrimeJourney platform:
//! - Registration with password strength checks and uniqueness validation
//! - JWT login with access/refresh token pairs
//! - Refresh token ledger with revocation (blacklist)
//! - Authenticated current-user endpoint
//!
//! The crate is organized as a library plus a thin server binary. The
//! library exposes [`AuthService`] for embedding and [`create_router`]
//! for mounting the HTTP surface.

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod password;
pub mod registration;
pub mod service;

pub use config::AppConfig;
pub use error::{ApiError, FieldErrors};
pub use extractors::AuthUser;
pub use handlers::{create_router, AuthState};
pub use models::{
    Account, AccountResponse, LoginRequest, RefreshRequest, RegisterRequest, TokenClaims,
    TokenKind, TokenPairResponse,
};
pub use password::{PasswordPolicy, PolicyViolation};
pub use service::AuthService;
