//! Authentication REST endpoints

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use storefront_database::UserRole;
use tracing::info;
use utoipa::ToSchema;

use crate::error::{ErrorResponse, GatewayError, GatewayResult};
use crate::middleware::AuthenticatedUser;
use crate::rest::models::{SessionResponse, UserResponse};
use crate::state::GatewayState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DevTokenRequest {
    pub display_name: String,
    /// `buyer` (default), `seller`, `support` or `admin`.
    #[serde(default)]
    pub role: Option<String>,
}

/// Development endpoint: create a user and hand back a session for it.
#[utoipa::path(
    post,
    path = "/api/auth/dev/token",
    tag = "Auth",
    request_body = DevTokenRequest,
    responses(
        (status = 201, description = "Development session issued", body = SessionResponse),
        (status = 400, description = "Invalid display name or role", body = ErrorResponse),
        (status = 404, description = "Development tokens are disabled", body = ErrorResponse)
    )
)]
pub async fn dev_token(
    State(state): State<Arc<GatewayState>>,
    payload: Result<Json<DevTokenRequest>, JsonRejection>,
) -> GatewayResult<(StatusCode, Json<SessionResponse>)> {
    if !state.allow_dev_tokens() {
        return Err(GatewayError::not_found("development tokens are disabled"));
    }

    let Json(payload) = payload?;
    let display_name = payload.display_name.trim();
    if display_name.is_empty() {
        return Err(GatewayError::InvalidRequest(
            "displayName must not be empty".into(),
        ));
    }

    let role = match payload.role.as_deref() {
        None => UserRole::Buyer,
        Some(value) => UserRole::parse(value)
            .ok_or_else(|| GatewayError::InvalidRequest(format!("unknown role {value}")))?,
    };

    let authenticator = state.hub().authenticator();
    let user = authenticator.create_user(display_name, role).await?;
    let session = authenticator.issue_session(user.id).await?;

    info!(user_id = user.id, role = %role, "issued development session");
    Ok((StatusCode::CREATED, Json(SessionResponse::new(&session, &user))))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    security(("bearerAuth" = [])),
    responses(
        (status = 204, description = "Session revoked"),
        (status = 401, description = "Invalid token", body = ErrorResponse)
    )
)]
pub async fn logout(
    State(state): State<Arc<GatewayState>>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> GatewayResult<StatusCode> {
    state
        .hub()
        .authenticator()
        .revoke_session(&caller.token)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Current user information", body = UserResponse),
        (status = 401, description = "Invalid token", body = ErrorResponse)
    )
)]
pub async fn me(Extension(caller): Extension<AuthenticatedUser>) -> Json<UserResponse> {
    Json(UserResponse::from(&caller.user))
}
