//! HTTP Handlers
//!
//! REST API endpoints and router assembly. Paths mirror the public API:
//! everything account-related lives under /api/auth/ with trailing
//! slashes, plus a bare /health liveness check.

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::middleware;
use crate::models::{AccountResponse, LoginRequest, RefreshRequest, RegisterRequest};
use crate::service::AuthService;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    middleware as axum_middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use validator::Validate;

/// Shared service state
pub type AuthState = Arc<AuthService>;

// ============================================
// Route Builder
// ============================================

/// Create the application router
pub fn create_router(auth_service: AuthState) -> Router {
    let public = Router::new()
        .route("/api/auth/register/", post(register))
        .route("/api/auth/login/", post(login))
        .route("/api/auth/refresh/", post(refresh))
        .route("/api/auth/blacklist/", post(blacklist));

    let protected = Router::new()
        .route("/api/auth/me/", get(me))
        .layer(axum_middleware::from_fn_with_state(
            auth_service.clone(),
            middleware::require_auth,
        ));

    let cors = build_cors(auth_service.config());

    Router::new()
        .route("/health", get(health))
        .merge(public)
        .merge(protected)
        .layer(axum_middleware::from_fn_with_state(
            auth_service.clone(),
            middleware::enforce_allowed_hosts,
        ))
        .layer(cors)
        .with_state(auth_service)
}

/// Build the CORS layer from the configured origin list
fn build_cors(config: &AppConfig) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    if config.cors_allowed_origins.iter().any(|o| o == "*") {
        base.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_allowed_origins
            .iter()
            .filter_map(|s| HeaderValue::from_str(s).ok())
            .collect();
        base.allow_origin(origins).allow_credentials(true)
    }
}

// ============================================
// Registration
// ============================================

/// POST /api/auth/register/
///
/// Create a new account
pub async fn register(
    State(auth): State<AuthState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let account = auth.register(req).await?;

    Ok((StatusCode::CREATED, Json(AccountResponse::from(account))))
}

// ============================================
// Tokens
// ============================================

/// POST /api/auth/login/
///
/// Verify credentials and return an access/refresh token pair
pub async fn login(
    State(auth): State<AuthState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let tokens = auth.login(req).await?;

    Ok(Json(tokens))
}

/// POST /api/auth/refresh/
///
/// Exchange a refresh token for a new access token
pub async fn refresh(
    State(auth): State<AuthState>,
    Json(req): Json<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let token = auth.refresh(&req.refresh).await?;

    Ok(Json(token))
}

/// POST /api/auth/blacklist/
///
/// Revoke a refresh token
pub async fn blacklist(
    State(auth): State<AuthState>,
    Json(req): Json<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    auth.blacklist(&req.refresh).await?;

    Ok(Json(serde_json::json!({})))
}

// ============================================
// Current User
// ============================================

/// GET /api/auth/me/
///
/// Get the authenticated account's public profile
pub async fn me(
    State(auth): State<AuthState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let account = auth
        .get_account(user.id)
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    Ok(Json(AccountResponse::from(account)))
}

/// GET /health
///
/// Liveness check
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

// ============================================
// Tests
// ============================================
