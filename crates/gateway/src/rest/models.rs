//! JSON bodies shared by the REST endpoints. Field names are camelCase on
//! the wire.

use serde::{Deserialize, Serialize};
use storefront_auth::AuthSession;
use storefront_database::types::format_timestamp;
use storefront_database::{Message, Notification, Room, User};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub display_name: String,
    pub role: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.public_id.clone(),
            display_name: user.display_name.clone(),
            role: user.role.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub token: String,
    pub user: UserResponse,
    pub expires_at: String,
}

impl SessionResponse {
    pub fn new(session: &AuthSession, user: &User) -> Self {
        Self {
            token: session.token.clone(),
            user: user.into(),
            expires_at: format_timestamp(session.expires_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomResponse {
    pub id: String,
    pub kind: String,
    /// Public ids of both participants.
    pub participants: Vec<String>,
    pub created_at: String,
    pub last_message_at: Option<String>,
    /// Users currently typing; only filled in on single-room lookups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typing_users: Option<Vec<String>>,
    /// Participants with a live socket; single-room lookups only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online_participants: Option<Vec<String>>,
}

impl From<&Room> for RoomResponse {
    fn from(room: &Room) -> Self {
        Self {
            id: room.public_id.clone(),
            kind: room.kind.to_string(),
            participants: room
                .participant_public_ids()
                .iter()
                .map(|id| id.to_string())
                .collect(),
            created_at: room.created_at.clone(),
            last_message_at: room.last_message_at.clone(),
            typing_users: None,
            online_participants: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: i64,
    pub room_id: String,
    pub sender_id: String,
    pub sender_display_name: String,
    pub content: String,
    pub message_type: String,
    pub created_at: String,
}

impl From<&Message> for MessageResponse {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id,
            room_id: message.room_public_id.clone(),
            sender_id: message.sender_public_id.clone(),
            sender_display_name: message.sender_display_name.clone(),
            content: message.content.clone(),
            message_type: message.message_type.to_string(),
            created_at: message.created_at.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub is_read: bool,
    pub created_at: String,
    pub read_at: Option<String>,
}

impl From<&Notification> for NotificationResponse {
    fn from(notification: &Notification) -> Self {
        Self {
            id: notification.id,
            title: notification.title.clone(),
            content: notification.content.clone(),
            is_read: notification.is_read,
            created_at: notification.created_at.clone(),
            read_at: notification.read_at.clone(),
        }
    }
}
