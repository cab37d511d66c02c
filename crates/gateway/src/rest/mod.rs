//! REST API endpoints for the gateway

pub mod admin;
pub mod auth;
pub mod health;
pub mod message;
pub mod models;
pub mod notifications;
pub mod presence;
pub mod rooms;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};

use crate::middleware::auth_middleware;
use crate::state::GatewayState;

/// Create all REST API routes. Everything except health and the dev token
/// endpoint requires a bearer token.
pub fn create_rest_routes(state: Arc<GatewayState>) -> Router<Arc<GatewayState>> {
    let protected = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/logout", post(auth::logout))
        // Room routes
        .route("/api/rooms", get(rooms::list_rooms).post(rooms::create_room))
        .route("/api/rooms/:room_id", get(rooms::get_room))
        .route("/api/rooms/:room_id/messages", get(message::list_messages))
        // Message routes
        .route("/api/messages", post(message::send_message))
        // Notification routes
        .route("/api/notifications", get(notifications::list_notifications))
        .route(
            "/api/notifications/unread-count",
            get(notifications::unread_count),
        )
        .route(
            "/api/notifications/read-all",
            put(notifications::mark_all_read),
        )
        .route(
            "/api/notifications/:notification_id/read",
            put(notifications::mark_notification_read),
        )
        .route(
            "/api/admin/notifications",
            post(admin::create_notification),
        )
        .route("/api/users/:user_id/presence", get(presence::user_presence))
        .route_layer(axum_middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/auth/dev/token", post(auth::dev_token))
        .merge(protected)
}
