//! Storefront Database Crate
//!
//! SQLite persistence for the realtime chat core: connection setup,
//! embedded migrations and repositories for users, sessions, rooms,
//! messages and notifications.

use storefront_config::DatabaseConfig;

pub mod connection;
pub mod entities;
pub mod migrations;
pub mod repos;
pub mod types;

pub use connection::{ping, prepare_database};
pub use migrations::run_migrations;

pub use repos::{
    MessageRepository, NotificationRepository, RoomRepository, SessionRepository, UserRepository,
};

pub use entities::{
    AuthSession, Message, MessageType, Notification, Room, RoomKind, User, UserRole,
};

pub use types::{DatabaseError, DatabaseResult};

pub use sqlx::SqlitePool;

/// Open the pool and bring the schema up to date.
pub async fn initialize_database(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    let pool = prepare_database(config)
        .await
        .map_err(|e| DatabaseError::ConnectionError(format!("{e:#}")))?;

    run_migrations(&pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(format!("{e:#}")))?;

    Ok(pool)
}
