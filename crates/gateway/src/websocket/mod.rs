//! WebSocket endpoint for the live event channel

mod session;

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, ws::WebSocketUpgrade, Query, State},
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::{debug, warn};
use utoipa::IntoParams;

use crate::error::{ErrorResponse, GatewayResult};
use crate::state::GatewayState;

use self::session::Authenticated;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WebSocketQuery {
    /// Session token. When absent the first event must be `join`.
    pub token: Option<String>,
}

/// Create all WebSocket routes
pub fn create_websocket_routes() -> Router<Arc<GatewayState>> {
    Router::new().route("/ws", get(websocket_handler))
}

/// Upgrade to the live channel. A token in the query string is checked
/// before the upgrade so a bad one is refused with 401.
#[utoipa::path(
    get,
    path = "/ws",
    tag = "Realtime",
    params(WebSocketQuery),
    responses(
        (status = 101, description = "Switching to the live event channel"),
        (status = 401, description = "Invalid, expired or unknown token", body = ErrorResponse)
    )
)]
pub async fn websocket_handler(
    State(state): State<Arc<GatewayState>>,
    query: Result<Query<WebSocketQuery>, QueryRejection>,
    ws: WebSocketUpgrade,
) -> GatewayResult<Response> {
    let Query(query) = query?;
    let token = query.token.filter(|token| !token.trim().is_empty());

    let Some(token) = token else {
        debug!("socket opened without token, waiting for join");
        return Ok(ws.on_upgrade(move |socket| session::serve(socket, state, None)));
    };

    let hub = state.hub().clone();
    let (outbound_tx, outbound) = hub.outbound_channel();
    let connection = hub.connect(&token, outbound_tx).await?;
    let connection_id = connection.id();

    Ok(ws
        .on_failed_upgrade(move |error| {
            warn!(connection_id = %connection_id, %error, "websocket upgrade failed");
            tokio::spawn(async move {
                hub.disconnect(connection_id).await;
            });
        })
        .on_upgrade(move |socket| {
            session::serve(
                socket,
                state,
                Some(Authenticated {
                    connection,
                    outbound,
                }),
            )
        }))
}
