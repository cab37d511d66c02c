use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use storefront_database::UserRole;
use tracing::warn;
use utoipa::ToSchema;

use crate::error::{ErrorResponse, GatewayError, GatewayResult};
use crate::middleware::AuthenticatedUser;
use crate::rest::models::NotificationResponse;
use crate::state::GatewayState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationRequest {
    /// Public id of the recipient.
    pub user_id: String,
    pub title: String,
    pub content: String,
}

#[utoipa::path(
    post,
    path = "/api/admin/notifications",
    tag = "Admin",
    security(("bearerAuth" = [])),
    request_body = CreateNotificationRequest,
    responses(
        (status = 201, description = "Notification stored and pushed to live connections", body = NotificationResponse),
        (status = 400, description = "Unknown recipient or empty fields", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse)
    )
)]
pub async fn create_notification(
    State(state): State<Arc<GatewayState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    payload: Result<Json<CreateNotificationRequest>, JsonRejection>,
) -> GatewayResult<(StatusCode, Json<NotificationResponse>)> {
    if caller.user.role != UserRole::Admin {
        warn!(user_id = caller.user.id, "non-admin tried to send a notification");
        return Err(GatewayError::AuthorizationFailed(
            "admin role required".into(),
        ));
    }

    let Json(payload) = payload?;
    let notification = state
        .hub()
        .notifications()
        .notify_public_id(&payload.user_id, &payload.title, &payload.content)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(NotificationResponse::from(&notification)),
    ))
}
