use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{ErrorResponse, GatewayResult};
use crate::state::GatewayState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PresenceResponse {
    pub user_id: String,
    pub online: bool,
}

/// A user is online while at least one of their sockets is connected.
#[utoipa::path(
    get,
    path = "/api/users/{user_id}/presence",
    tag = "Presence",
    security(("bearerAuth" = [])),
    params(("user_id" = String, Path, description = "User public ID")),
    responses(
        (status = 200, description = "Current presence", body = PresenceResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
pub async fn user_presence(
    State(state): State<Arc<GatewayState>>,
    Path(user_id): Path<String>,
) -> GatewayResult<Json<PresenceResponse>> {
    let hub = state.hub();
    let user = hub.authenticator().find_user(&user_id).await?;
    let online = hub.presence().is_online(user.id).await;

    Ok(Json(PresenceResponse {
        user_id: user.public_id,
        online,
    }))
}
