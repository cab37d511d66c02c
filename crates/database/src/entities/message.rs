//! Message entity definitions

use serde::{Deserialize, Serialize};

/// An immutable chat message. `id` is assigned by SQLite and grows
/// monotonically, so ordering by id is ordering by append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub room_id: i64,
    pub room_public_id: String,
    pub sender_id: i64,
    pub sender_public_id: String,
    pub sender_display_name: String,
    pub content: String,
    pub message_type: MessageType,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    #[default]
    Text,
    Image,
    System,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::Image => "image",
            MessageType::System => "system",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(MessageType::Text),
            "image" => Some(MessageType::Image),
            "system" => Some(MessageType::System),
            _ => None,
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
