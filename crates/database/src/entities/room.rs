//! Room entity definitions

use serde::{Deserialize, Serialize};

/// A two-party conversation.
///
/// Participants are stored ordered (`participant_low < participant_high`)
/// so the unordered pair plus [`RoomKind`] maps to exactly one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: i64,
    pub public_id: String,
    pub kind: RoomKind,
    pub participant_low: i64,
    pub participant_high: i64,
    pub participant_low_public_id: String,
    pub participant_high_public_id: String,
    pub created_at: String,
    pub last_message_at: Option<String>,
}

impl Room {
    pub fn participant_ids(&self) -> [i64; 2] {
        [self.participant_low, self.participant_high]
    }

    pub fn participant_public_ids(&self) -> [&str; 2] {
        [
            self.participant_low_public_id.as_str(),
            self.participant_high_public_id.as_str(),
        ]
    }

    pub fn has_participant(&self, user_id: i64) -> bool {
        self.participant_low == user_id || self.participant_high == user_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomKind {
    #[default]
    Direct,
    Support,
}

impl RoomKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomKind::Direct => "direct",
            RoomKind::Support => "support",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "direct" => Some(RoomKind::Direct),
            "support" => Some(RoomKind::Support),
            _ => None,
        }
    }
}

impl std::fmt::Display for RoomKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
