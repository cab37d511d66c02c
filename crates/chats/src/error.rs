//! Error types for the realtime chat core.

use storefront_auth::AuthError;
use storefront_database::DatabaseError;
use thiserror::Error;
use uuid::Uuid;

pub type ChatResult<T> = Result<T, ChatError>;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Authentication failed: {reason}")]
    Authentication { reason: String },

    #[error("Not authorized: {reason}")]
    Authorization { reason: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Room not found: {id}")]
    RoomNotFound { id: String },

    #[error("Notification not found: {id}")]
    NotificationNotFound { id: i64 },

    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] DatabaseError),

    #[error("Session store failure: {0}")]
    Session(AuthError),
}

impl ChatError {
    pub fn authentication(reason: impl Into<String>) -> Self {
        Self::Authentication {
            reason: reason.into(),
        }
    }

    pub fn authorization(reason: impl Into<String>) -> Self {
        Self::Authorization {
            reason: reason.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn room_not_found(id: impl Into<String>) -> Self {
        Self::RoomNotFound { id: id.into() }
    }

    /// Stable wire code sent to clients in `error` events and REST bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ChatError::Authentication { .. } => "authentication_error",
            ChatError::Authorization { .. } => "authorization_error",
            ChatError::Validation { .. } => "validation_error",
            ChatError::RoomNotFound { .. } => "room_not_found",
            ChatError::NotificationNotFound { .. } => "notification_not_found",
            ChatError::Delivery(_) => "delivery_error",
            ChatError::Persistence(_) | ChatError::Session(_) => "internal_error",
        }
    }

    /// Message safe to show a client. Storage failures are not described.
    pub fn client_message(&self) -> String {
        match self {
            ChatError::Persistence(_) | ChatError::Session(_) => {
                "internal server error".to_string()
            }
            other => other.to_string(),
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, ChatError::Persistence(_) | ChatError::Session(_))
    }
}

impl From<AuthError> for ChatError {
    fn from(error: AuthError) -> Self {
        if error.is_credential_error() {
            ChatError::authentication(error.to_string())
        } else {
            ChatError::Session(error)
        }
    }
}

/// Failure to enqueue an event on one subscriber's outbound queue.
///
/// Fan-out logs and drops these; they never reach the sender.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("outbound queue full for connection {connection_id}")]
    QueueFull { connection_id: Uuid },

    #[error("connection {connection_id} is closed")]
    Closed { connection_id: Uuid },
}
