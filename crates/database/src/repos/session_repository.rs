//! Session repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::entities::AuthSession;
use crate::types::{format_timestamp, DatabaseError, DatabaseResult};

const SESSION_COLUMNS: &str = "id, user_id, token, created_at, expires_at";

#[derive(Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: i64,
        token: &str,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> DatabaseResult<AuthSession> {
        let result = sqlx::query(
            "INSERT INTO sessions (user_id, token, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(token)
        .bind(format_timestamp(created_at))
        .bind(format_timestamp(expires_at))
        .execute(&self.pool)
        .await?;

        let row = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?"
        ))
        .bind(result.last_insert_rowid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref()
            .map(map_session)
            .transpose()?
            .ok_or_else(|| DatabaseError::NotFound("created session".to_string()))
    }

    pub async fn find_by_token(&self, token: &str) -> DatabaseResult<Option<AuthSession>> {
        let row = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE token = ?"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_session).transpose()
    }

    /// Returns whether a session was removed.
    pub async fn delete_by_token(&self, token: &str) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_expired(&self, now: DateTime<Utc>) -> DatabaseResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(format_timestamp(now))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn map_session(row: &SqliteRow) -> DatabaseResult<AuthSession> {
    Ok(AuthSession {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        token: row.try_get("token")?,
        created_at: row.try_get("created_at")?,
        expires_at: row.try_get("expires_at")?,
    })
}
