//! Message REST endpoints

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use storefront_database::MessageType;
use utoipa::{IntoParams, ToSchema};

use crate::error::{ErrorResponse, GatewayError, GatewayResult};
use crate::middleware::AuthenticatedUser;
use crate::rest::models::MessageResponse;
use crate::state::GatewayState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub room_id: String,
    pub content: String,
    /// `text` (default), `image` or `system`.
    #[serde(default)]
    pub message_type: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListMessagesQuery {
    /// Only messages with an id lower than this one.
    pub before: Option<i64>,
    /// Page size, default 50, capped at 200.
    pub limit: Option<u32>,
}

#[utoipa::path(
    get,
    path = "/api/rooms/{room_id}/messages",
    tag = "Messages",
    security(("bearerAuth" = [])),
    params(
        ("room_id" = String, Path, description = "Room public ID"),
        ListMessagesQuery
    ),
    responses(
        (status = 200, description = "A page of history, oldest first", body = Vec<MessageResponse>),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Caller is not a participant", body = ErrorResponse)
    )
)]
pub async fn list_messages(
    State(state): State<Arc<GatewayState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(room_id): Path<String>,
    query: Result<Query<ListMessagesQuery>, QueryRejection>,
) -> GatewayResult<Json<Vec<MessageResponse>>> {
    let Query(query) = query?;
    let messages = state
        .hub()
        .messages()
        .list_messages(&caller.user, &room_id, query.before, query.limit)
        .await?;
    Ok(Json(messages.iter().map(MessageResponse::from).collect()))
}

/// Same pipeline as the socket `send_message` event: persisted, then pushed
/// to every subscriber of the room and every connection of the sender.
#[utoipa::path(
    post,
    path = "/api/messages",
    tag = "Messages",
    security(("bearerAuth" = [])),
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Message stored and broadcast", body = MessageResponse),
        (status = 400, description = "Empty or oversized content", body = ErrorResponse),
        (status = 403, description = "Caller is not a participant", body = ErrorResponse)
    )
)]
pub async fn send_message(
    State(state): State<Arc<GatewayState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> GatewayResult<(StatusCode, Json<MessageResponse>)> {
    let Json(payload) = payload?;
    let message_type = match payload.message_type.as_deref() {
        None => MessageType::default(),
        Some(value) => MessageType::parse(value)
            .ok_or_else(|| GatewayError::InvalidRequest(format!("unknown message type {value}")))?,
    };

    let message = state
        .hub()
        .messages()
        .send_message(&caller.user, &payload.room_id, &payload.content, message_type)
        .await?;
    Ok((StatusCode::CREATED, Json(MessageResponse::from(&message))))
}
