//! Notification REST endpoints for the signed-in user

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::{ErrorResponse, GatewayResult};
use crate::middleware::AuthenticatedUser;
use crate::rest::models::NotificationResponse;
use crate::state::GatewayState;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct ListNotificationsQuery {
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UnreadCountResponse {
    pub count: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

#[utoipa::path(
    get,
    path = "/api/notifications",
    tag = "Notifications",
    security(("bearerAuth" = [])),
    params(ListNotificationsQuery),
    responses(
        (status = 200, description = "Notifications, newest first", body = Vec<NotificationResponse>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn list_notifications(
    State(state): State<Arc<GatewayState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    query: Result<Query<ListNotificationsQuery>, QueryRejection>,
) -> GatewayResult<Json<Vec<NotificationResponse>>> {
    let Query(query) = query?;
    let notifications = state
        .hub()
        .notifications()
        .list_notifications(caller.user.id, query.unread_only)
        .await?;
    Ok(Json(
        notifications.iter().map(NotificationResponse::from).collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/api/notifications/unread-count",
    tag = "Notifications",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Number of unread notifications", body = UnreadCountResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn unread_count(
    State(state): State<Arc<GatewayState>>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> GatewayResult<Json<UnreadCountResponse>> {
    let count = state
        .hub()
        .notifications()
        .unread_count(caller.user.id)
        .await?;
    Ok(Json(UnreadCountResponse { count }))
}

#[utoipa::path(
    put,
    path = "/api/notifications/{notification_id}/read",
    tag = "Notifications",
    security(("bearerAuth" = [])),
    params(("notification_id" = i64, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification marked read", body = NotificationResponse),
        (status = 403, description = "Notification belongs to another user", body = ErrorResponse),
        (status = 404, description = "Notification not found", body = ErrorResponse)
    )
)]
pub async fn mark_notification_read(
    State(state): State<Arc<GatewayState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    notification_id: Result<Path<i64>, PathRejection>,
) -> GatewayResult<Json<NotificationResponse>> {
    let Path(notification_id) = notification_id?;
    let notification = state
        .hub()
        .notifications()
        .mark_read(caller.user.id, notification_id)
        .await?;
    Ok(Json(NotificationResponse::from(&notification)))
}

#[utoipa::path(
    put,
    path = "/api/notifications/read-all",
    tag = "Notifications",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "All notifications marked read", body = MarkAllReadResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn mark_all_read(
    State(state): State<Arc<GatewayState>>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> GatewayResult<Json<MarkAllReadResponse>> {
    let updated = state
        .hub()
        .notifications()
        .mark_all_read(caller.user.id)
        .await?;
    Ok(Json(MarkAllReadResponse { updated }))
}
