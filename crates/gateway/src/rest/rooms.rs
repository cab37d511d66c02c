//! Room REST endpoints

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use storefront_database::RoomKind;
use utoipa::ToSchema;

use crate::error::{ErrorResponse, GatewayError, GatewayResult};
use crate::middleware::AuthenticatedUser;
use crate::rest::models::RoomResponse;
use crate::state::GatewayState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    /// Public id of the other participant.
    pub partner_id: String,
    /// `direct` (default) or `support`.
    #[serde(default)]
    pub kind: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/rooms",
    tag = "Rooms",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Rooms of the caller, most recently active first", body = Vec<RoomResponse>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn list_rooms(
    State(state): State<Arc<GatewayState>>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> GatewayResult<Json<Vec<RoomResponse>>> {
    let rooms = state.hub().rooms().list_rooms(caller.user.id).await?;
    Ok(Json(rooms.iter().map(RoomResponse::from).collect()))
}

/// Open the room with a partner, or return the existing one.
#[utoipa::path(
    post,
    path = "/api/rooms",
    tag = "Rooms",
    security(("bearerAuth" = [])),
    request_body = CreateRoomRequest,
    responses(
        (status = 200, description = "The room shared with the partner", body = RoomResponse),
        (status = 400, description = "Unknown partner, self or invalid kind", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn create_room(
    State(state): State<Arc<GatewayState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    payload: Result<Json<CreateRoomRequest>, JsonRejection>,
) -> GatewayResult<Json<RoomResponse>> {
    let Json(payload) = payload?;
    let kind = match payload.kind.as_deref() {
        None => RoomKind::default(),
        Some(value) => RoomKind::parse(value)
            .ok_or_else(|| GatewayError::InvalidRequest(format!("unknown room kind {value}")))?,
    };

    let room = state
        .hub()
        .rooms()
        .get_or_create_room(&caller.user, payload.partner_id.trim(), kind)
        .await?;
    Ok(Json(RoomResponse::from(&room)))
}

#[utoipa::path(
    get,
    path = "/api/rooms/{room_id}",
    tag = "Rooms",
    security(("bearerAuth" = [])),
    params(("room_id" = String, Path, description = "Room public ID")),
    responses(
        (status = 200, description = "Room details with typing and online participants", body = RoomResponse),
        (status = 403, description = "Caller is not a participant", body = ErrorResponse),
        (status = 404, description = "Room not found", body = ErrorResponse)
    )
)]
pub async fn get_room(
    State(state): State<Arc<GatewayState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(room_id): Path<String>,
) -> GatewayResult<Json<RoomResponse>> {
    let hub = state.hub();
    let room = hub.rooms().get_room(&caller.user, &room_id).await?;

    let mut response = RoomResponse::from(&room);
    response.typing_users = Some(hub.presence().typing_users(&room.public_id).await);

    let online = hub.presence().online_users(&room.participant_ids()).await;
    response.online_participants = Some(
        room.participant_ids()
            .iter()
            .zip(room.participant_public_ids())
            .filter(|(id, _)| online.contains(*id))
            .map(|(_, public_id)| public_id.to_string())
            .collect(),
    );
    Ok(Json(response))
}
