//! Session store: resolves bearer tokens to storefront users.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::Serialize;
use storefront_config::AuthConfig;
use storefront_database::types::parse_timestamp;
use storefront_database::{
    DatabaseError, SessionRepository, SqlitePool, User, UserRepository, UserRole,
};
use thiserror::Error;
use tracing::{debug, info};

/// Upper bound on session lifetime (100 years) so expiry stays a valid RFC 3339 date.
const MAX_SESSION_TTL_SECONDS: i64 = 100 * 365 * 24 * 60 * 60;

#[derive(Clone)]
pub struct Authenticator {
    users: UserRepository,
    sessions: SessionRepository,
    session_ttl: Duration,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("session not found")]
    SessionNotFound,
    #[error("session expired")]
    SessionExpired,
    #[error("invalid session token")]
    InvalidSession,
    #[error("user not found")]
    UserNotFound,
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
}

impl AuthError {
    /// Whether the error means "the caller is not who they claim to be", as
    /// opposed to a failure of the store itself.
    pub fn is_credential_error(&self) -> bool {
        !matches!(self, AuthError::Database(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub token: String,
    #[serde(skip_serializing)]
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
}

impl Authenticator {
    pub fn new(pool: SqlitePool, config: &AuthConfig) -> Self {
        let ttl_seconds = i64::try_from(config.session_ttl_seconds)
            .unwrap_or(MAX_SESSION_TTL_SECONDS)
            .min(MAX_SESSION_TTL_SECONDS);
        let session_ttl = Duration::seconds(ttl_seconds);

        Self {
            users: UserRepository::new(pool.clone()),
            sessions: SessionRepository::new(pool),
            session_ttl,
        }
    }

    /// Resolve a bearer token. Expired sessions are deleted on sight.
    pub async fn authenticate_token(&self, token: &str) -> Result<(User, AuthSession), AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::SessionNotFound);
        }

        let Some(stored) = self.sessions.find_by_token(token).await? else {
            return Err(AuthError::SessionNotFound);
        };

        let expires_at =
            parse_timestamp(&stored.expires_at).map_err(|_| AuthError::InvalidSession)?;

        if expires_at <= Utc::now() {
            self.sessions.delete_by_token(token).await?;
            debug!(user_id = stored.user_id, "rejected expired session");
            return Err(AuthError::SessionExpired);
        }

        let user = self.user_profile(stored.user_id).await?;
        let session = AuthSession {
            token: stored.token,
            user_id: stored.user_id,
            expires_at,
        };

        Ok((user, session))
    }

    pub async fn user_profile(&self, user_id: i64) -> Result<User, AuthError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    pub async fn find_user(&self, public_id: &str) -> Result<User, AuthError> {
        self.users
            .find_by_public_id(public_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Create an account locally. Only used for development tokens and seeding;
    /// production accounts come from the account service.
    pub async fn create_user(&self, display_name: &str, role: UserRole) -> Result<User, AuthError> {
        let user = self.users.create(display_name, role).await?;
        info!(user = %user.public_id, role = %user.role, "created local user");
        Ok(user)
    }

    pub async fn issue_session(&self, user_id: i64) -> Result<AuthSession, AuthError> {
        let token = self.generate_session_token();
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(self.session_ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        self.sessions.create(user_id, &token, now, expires_at).await?;

        Ok(AuthSession {
            token,
            user_id,
            expires_at,
        })
    }

    pub async fn revoke_session(&self, token: &str) -> Result<bool, AuthError> {
        Ok(self.sessions.delete_by_token(token).await?)
    }

    pub async fn purge_expired_sessions(&self) -> Result<u64, AuthError> {
        let removed = self.sessions.delete_expired(Utc::now()).await?;
        if removed > 0 {
            info!(removed, "purged expired sessions");
        }
        Ok(removed)
    }

    fn generate_session_token(&self) -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }
}
