use axum::Json;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::rest::health::health_check,
        crate::rest::auth::dev_token,
        crate::rest::auth::logout,
        crate::rest::auth::me,
        crate::rest::rooms::list_rooms,
        crate::rest::rooms::create_room,
        crate::rest::rooms::get_room,
        crate::rest::message::list_messages,
        crate::rest::message::send_message,
        crate::rest::notifications::list_notifications,
        crate::rest::notifications::unread_count,
        crate::rest::notifications::mark_notification_read,
        crate::rest::notifications::mark_all_read,
        crate::rest::admin::create_notification,
        crate::rest::presence::user_presence,
        crate::websocket::websocket_handler
    ),
    components(
        schemas(
            crate::error::ErrorResponse,
            crate::rest::health::HealthResponse,
            crate::rest::auth::DevTokenRequest,
            crate::rest::models::SessionResponse,
            crate::rest::models::UserResponse,
            crate::rest::models::RoomResponse,
            crate::rest::models::MessageResponse,
            crate::rest::models::NotificationResponse,
            crate::rest::rooms::CreateRoomRequest,
            crate::rest::message::SendMessageRequest,
            crate::rest::notifications::UnreadCountResponse,
            crate::rest::notifications::MarkAllReadResponse,
            crate::rest::admin::CreateNotificationRequest,
            crate::rest::presence::PresenceResponse,
        )
    ),
    tags(
        (name = "Health", description = "Service health endpoints"),
        (name = "Auth", description = "Session management"),
        (name = "Rooms", description = "Buyer/seller and support rooms"),
        (name = "Messages", description = "Room history and sending"),
        (name = "Notifications", description = "Admin notifications for the signed-in user"),
        (name = "Admin", description = "Staff-only operations"),
        (name = "Presence", description = "Online status"),
        (name = "Realtime", description = "WebSocket live channel"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        let schemes = &mut components.security_schemes;

        let mut scheme = SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer));
        if let SecurityScheme::Http(http) = &mut scheme {
            http.bearer_format = Some("Bearer".to_string());
        }

        schemes.insert("bearerAuth".to_string(), scheme);
    }
}

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
