//! Session entity definitions

use serde::{Deserialize, Serialize};

/// Bearer session issued by the session store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub id: i64,
    pub user_id: i64,
    pub token: String,
    pub created_at: String,
    pub expires_at: String,
}
