//! Live channel events.
//!
//! Both directions are closed, internally tagged enums:
//! `{"type": "send_message", "room_id": "...", ...}`.

use serde::{Deserialize, Serialize};
use storefront_database::{Message, MessageType, Notification, Room, RoomKind, User, UserRole};
use uuid::Uuid;

use crate::error::ChatError;

/// Events a client may send. Unknown keys in an event are rejected so a
/// misspelled field fails loudly instead of falling back to a default.
/// `ping` carries no payload and ignores whatever else it is sent with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum ClientEvent {
    Join {
        token: String,
    },
    JoinRoom {
        room_id: String,
    },
    LeaveRoom {
        room_id: String,
    },
    SendMessage {
        room_id: String,
        content: String,
        #[serde(default)]
        message_type: Option<MessageType>,
    },
    Typing {
        room_id: String,
        is_typing: bool,
    },
    MarkNotificationRead {
        notification_id: i64,
    },
    Ping,
}

impl ClientEvent {
    /// Decode one text frame. Anything that is not a known event is a
    /// validation error.
    pub fn parse(text: &str) -> Result<Self, ChatError> {
        serde_json::from_str(text)
            .map_err(|error| ChatError::validation(format!("malformed event: {error}")))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ClientEvent::Join { .. } => "join",
            ClientEvent::JoinRoom { .. } => "join_room",
            ClientEvent::LeaveRoom { .. } => "leave_room",
            ClientEvent::SendMessage { .. } => "send_message",
            ClientEvent::Typing { .. } => "typing",
            ClientEvent::MarkNotificationRead { .. } => "mark_notification_read",
            ClientEvent::Ping => "ping",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Joined {
        connection_id: Uuid,
        user: UserPayload,
    },
    RoomJoined {
        room_id: String,
    },
    RoomLeft {
        room_id: String,
    },
    NewMessage {
        message: MessagePayload,
    },
    UserTyping {
        room_id: String,
        user_id: String,
        display_name: String,
        is_typing: bool,
    },
    AdminNotification {
        notification: NotificationPayload,
    },
    NotificationRead {
        notification_id: i64,
    },
    Pong,
    Error {
        code: String,
        message: String,
    },
}

impl ServerEvent {
    pub fn error(error: &ChatError) -> Self {
        ServerEvent::Error {
            code: error.code().to_string(),
            message: error.client_message(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::Joined { .. } => "joined",
            ServerEvent::RoomJoined { .. } => "room_joined",
            ServerEvent::RoomLeft { .. } => "room_left",
            ServerEvent::NewMessage { .. } => "new_message",
            ServerEvent::UserTyping { .. } => "user_typing",
            ServerEvent::AdminNotification { .. } => "admin_notification",
            ServerEvent::NotificationRead { .. } => "notification_read",
            ServerEvent::Pong => "pong",
            ServerEvent::Error { .. } => "error",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Public view of a user. Internal row ids never leave the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPayload {
    pub id: String,
    pub display_name: String,
    pub role: UserRole,
}

impl From<&User> for UserPayload {
    fn from(user: &User) -> Self {
        Self {
            id: user.public_id.clone(),
            display_name: user.display_name.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePayload {
    pub id: i64,
    pub room_id: String,
    pub sender_id: String,
    pub sender_display_name: String,
    pub content: String,
    pub message_type: MessageType,
    pub created_at: String,
}

impl From<&Message> for MessagePayload {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id,
            room_id: message.room_public_id.clone(),
            sender_id: message.sender_public_id.clone(),
            sender_display_name: message.sender_display_name.clone(),
            content: message.content.clone(),
            message_type: message.message_type,
            created_at: message.created_at.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub is_read: bool,
    pub created_at: String,
}

impl From<&Notification> for NotificationPayload {
    fn from(notification: &Notification) -> Self {
        Self {
            id: notification.id,
            title: notification.title.clone(),
            content: notification.content.clone(),
            is_read: notification.is_read,
            created_at: notification.created_at.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomPayload {
    pub id: String,
    pub kind: RoomKind,
    pub participants: Vec<String>,
    pub created_at: String,
    pub last_message_at: Option<String>,
}

impl From<&Room> for RoomPayload {
    fn from(room: &Room) -> Self {
        Self {
            id: room.public_id.clone(),
            kind: room.kind,
            participants: room
                .participant_public_ids()
                .iter()
                .map(|id| id.to_string())
                .collect(),
            created_at: room.created_at.clone(),
            last_message_at: room.last_message_at.clone(),
        }
    }
}
