//! Request Middleware
//!
//! JWT verification for protected routes and Host header enforcement.
//! Both read their keys and allowlists from shared state; nothing here
//! touches the environment.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::ApiError;
use crate::handlers::AuthState;
use crate::models::TokenKind;

/// Require an authenticated caller
///
/// Verifies the bearer access token and stores the claims in request
/// extensions for extractors.
pub async fn require_auth(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok());

    let header = auth_header.ok_or(ApiError::Unauthenticated)?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::Unauthenticated)?;

    let claims = auth.verify_token(token, TokenKind::Access)?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Enforce the Host header allowlist
///
/// A request whose Host is not on the list is answered with 400 before any
/// handler runs. "*" admits every host.
pub async fn enforce_allowed_hosts(
    State(auth): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    let allowed = &auth.config().allowed_hosts;

    let host = req
        .headers()
        .get("Host")
        .and_then(|h| h.to_str().ok())
        .map(strip_port)
        .unwrap_or("");

    if host_allowed(host, allowed) {
        return next.run(req).await;
    }

    tracing::warn!(host = %host, "Request with disallowed Host header");
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({
            "error": "disallowed_host",
            "message": format!("Invalid Host header: {}", host)
        })),
    )
        .into_response()
}

/// Match a host against the allowlist
///
/// An entry of "*" matches anything; an entry starting with a dot matches
/// the domain itself and every subdomain.
fn host_allowed(host: &str, allowed: &[String]) -> bool {
    allowed.iter().any(|entry| {
        if entry == "*" {
            true
        } else if let Some(domain) = entry.strip_prefix('.') {
            host == domain || host.ends_with(entry.as_str())
        } else {
            entry == host
        }
    })
}

/// Drop a trailing numeric :port, leaving bracketed IPv6 literals intact
fn strip_port(host: &str) -> &str {
    if host.ends_with(']') {
        return host;
    }

    if let Some((domain, port)) = host.rsplit_once(':') {
        let numeric_port = !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit());
        if numeric_port && (domain.ends_with(']') || !domain.contains(':')) {
            return domain;
        }
    }

    host
}
