//! User entity definitions

use serde::{Deserialize, Serialize};

/// A storefront account as seen by the realtime core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub public_id: String,
    pub display_name: String,
    pub role: UserRole,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    /// Support staff and admins may open support rooms and post system messages.
    pub fn is_staff(&self) -> bool {
        matches!(self.role, UserRole::Support | UserRole::Admin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Buyer,
    Seller,
    Support,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Buyer => "buyer",
            UserRole::Seller => "seller",
            UserRole::Support => "support",
            UserRole::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "buyer" => Some(UserRole::Buyer),
            "seller" => Some(UserRole::Seller),
            "support" => Some(UserRole::Support),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UserRole::parse(s).ok_or_else(|| format!("unknown user role `{s}`"))
    }
}
