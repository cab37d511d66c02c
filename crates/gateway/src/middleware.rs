//! Middleware for authentication and request logging

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use storefront_database::User;
use tracing::info;

use crate::error::{GatewayError, GatewayResult};
use crate::state::GatewayState;

/// The caller resolved from a bearer token, stored in request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
    pub token: String,
}

/// Resolve the bearer token through the session store. Requests without a
/// valid session never reach the handler.
pub async fn auth_middleware(
    State(state): State<Arc<GatewayState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    let token = require_bearer(request.headers())?;

    let (user, _session) = state
        .hub()
        .authenticator()
        .authenticate_token(&token)
        .await?;

    request
        .extensions_mut()
        .insert(AuthenticatedUser { user, token });

    Ok(next.run(request).await)
}

/// Extract the token from `Authorization: Bearer <token>`. The scheme is
/// matched case-insensitively.
pub fn require_bearer(headers: &HeaderMap) -> GatewayResult<String> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| GatewayError::AuthenticationFailed("missing authorization header".into()))?;

    let mut parts = value.split_whitespace();
    let scheme = parts.next().unwrap_or("");
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return Err(GatewayError::AuthenticationFailed(
            "invalid authorization scheme".into(),
        ));
    }

    let token = parts.next().unwrap_or("");
    if token.is_empty() {
        return Err(GatewayError::AuthenticationFailed("missing bearer token".into()));
    }

    Ok(token.to_string())
}

/// Logging middleware for request/response logging
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().path().to_string();

    let start = std::time::Instant::now();
    let response = next.run(request).await;
    let duration = start.elapsed();

    info!(
        method = %method,
        uri = %uri,
        status = %response.status(),
        duration_ms = duration.as_millis() as u64,
        "request completed"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode};

    #[test]
    fn require_bearer_extracts_token_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("bearer TOKEN123"));

        let token = require_bearer(&headers).expect("token should be extracted");
        assert_eq!(token, "TOKEN123");
    }

    #[test]
    fn require_bearer_rejects_missing_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer"));

        let error = require_bearer(&headers).expect_err("should reject missing token");
        assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);
        assert!(error.to_string().contains("missing bearer token"));
    }

    #[test]
    fn require_bearer_rejects_other_schemes() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));

        let error = require_bearer(&headers).expect_err("basic auth is not accepted");
        assert_eq!(error.code(), "authentication_error");
        assert!(require_bearer(&HeaderMap::new()).is_err());
    }
}
