//! Notification entity definitions

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub is_read: bool,
    pub created_at: String,
    pub read_at: Option<String>,
}
