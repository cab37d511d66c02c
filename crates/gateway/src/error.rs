//! Error types for the gateway layer

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use storefront_auth::AuthError;
use storefront_chats::ChatError;
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

/// Body of every non-2xx REST response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Gateway error types
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Authorization failed: {0}")]
    AuthorizationFailed(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{message}")]
    NotFound { code: &'static str, message: String },

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("internal server error")]
    Internal,
}

impl GatewayError {
    pub fn not_found(message: impl Into<String>) -> Self {
        GatewayError::NotFound {
            code: "not_found",
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
            GatewayError::AuthorizationFailed(_) => StatusCode::FORBIDDEN,
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Same codes the socket uses in `error` events.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::AuthenticationFailed(_) => "authentication_error",
            GatewayError::AuthorizationFailed(_) => "authorization_error",
            GatewayError::InvalidRequest(_) => "validation_error",
            GatewayError::NotFound { code, .. } => *code,
            GatewayError::ServiceUnavailable(_) => "delivery_error",
            GatewayError::Internal => "internal_error",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.code().to_string(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

impl From<ChatError> for GatewayError {
    fn from(error: ChatError) -> Self {
        if error.is_internal() {
            error!(error = %error, "request failed");
            return GatewayError::Internal;
        }

        match error {
            ChatError::Authentication { reason } => GatewayError::AuthenticationFailed(reason),
            ChatError::Authorization { reason } => GatewayError::AuthorizationFailed(reason),
            ChatError::Validation { message } => GatewayError::InvalidRequest(message),
            ChatError::RoomNotFound { id } => GatewayError::NotFound {
                code: "room_not_found",
                message: format!("Room not found: {id}"),
            },
            ChatError::NotificationNotFound { id } => GatewayError::NotFound {
                code: "notification_not_found",
                message: format!("Notification not found: {id}"),
            },
            ChatError::Delivery(delivery) => GatewayError::ServiceUnavailable(delivery.to_string()),
            ChatError::Persistence(_) | ChatError::Session(_) => GatewayError::Internal,
        }
    }
}

impl From<AuthError> for GatewayError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::UserNotFound => GatewayError::not_found("User not found"),
            other => ChatError::from(other).into(),
        }
    }
}

impl From<JsonRejection> for GatewayError {
    fn from(rejection: JsonRejection) -> Self {
        GatewayError::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for GatewayError {
    fn from(rejection: QueryRejection) -> Self {
        GatewayError::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for GatewayError {
    fn from(rejection: PathRejection) -> Self {
        GatewayError::InvalidRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_database::DatabaseError;

    #[test]
    fn chat_errors_map_to_status_and_code() {
        let cases = [
            (ChatError::authentication("x"), StatusCode::UNAUTHORIZED, "authentication_error"),
            (ChatError::authorization("x"), StatusCode::FORBIDDEN, "authorization_error"),
            (ChatError::validation("x"), StatusCode::BAD_REQUEST, "validation_error"),
            (ChatError::room_not_found("r1"), StatusCode::NOT_FOUND, "room_not_found"),
            (
                ChatError::NotificationNotFound { id: 4 },
                StatusCode::NOT_FOUND,
                "notification_not_found",
            ),
        ];

        for (error, status, code) in cases {
            let mapped = GatewayError::from(error);
            assert_eq!(mapped.status_code(), status);
            assert_eq!(mapped.code(), code);
        }
    }

    #[test]
    fn persistence_errors_do_not_leak_details() {
        let mapped = GatewayError::from(ChatError::from(DatabaseError::InvalidData(
            "no such column: secret".into(),
        )));
        assert_eq!(mapped.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(mapped.code(), "internal_error");
        assert!(!mapped.to_string().contains("secret"));
    }

    #[test]
    fn missing_users_are_not_found_rather_than_unauthorized() {
        let mapped = GatewayError::from(AuthError::UserNotFound);
        assert_eq!(mapped.status_code(), StatusCode::NOT_FOUND);

        let mapped = GatewayError::from(AuthError::SessionExpired);
        assert_eq!(mapped.status_code(), StatusCode::UNAUTHORIZED);
    }
}
