//! Notification repository for database operations.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::entities::Notification;
use crate::types::{now_timestamp, DatabaseError, DatabaseResult};

const NOTIFICATION_COLUMNS: &str = "id, user_id, title, content, is_read, created_at, read_at";

#[derive(Clone)]
pub struct NotificationRepository {
    pool: SqlitePool,
}

impl NotificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: i64,
        title: &str,
        content: &str,
    ) -> DatabaseResult<Notification> {
        let result = sqlx::query(
            "INSERT INTO notifications (user_id, title, content, is_read, created_at) VALUES (?, ?, ?, 0, ?)",
        )
        .bind(user_id)
        .bind(title)
        .bind(content)
        .bind(now_timestamp())
        .execute(&self.pool)
        .await?;

        let notification_id = result.last_insert_rowid();
        self.find_by_id(notification_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("notification {notification_id}")))
    }

    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<Notification>> {
        let row = sqlx::query(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_notification).transpose()
    }

    /// Newest first; ties on `created_at` fall back to insertion order.
    pub async fn list_for_user(
        &self,
        user_id: i64,
        unread_only: bool,
    ) -> DatabaseResult<Vec<Notification>> {
        let rows = sqlx::query(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE user_id = ? AND (? = 0 OR is_read = 0) \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .bind(unread_only)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_notification).collect()
    }

    /// Marks the notification read only when `user_id` owns it. Returns the
    /// updated row, or `None` if no notification with that id belongs to
    /// the user.
    pub async fn mark_read(
        &self,
        id: i64,
        user_id: i64,
    ) -> DatabaseResult<Option<Notification>> {
        sqlx::query(
            "UPDATE notifications SET is_read = 1, read_at = COALESCE(read_at, ?) \
             WHERE id = ? AND user_id = ?",
        )
        .bind(now_timestamp())
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ? AND user_id = ?"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_notification).transpose()
    }

    /// Returns the number of notifications that changed state.
    pub async fn mark_all_read(&self, user_id: i64) -> DatabaseResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = 1, read_at = ? WHERE user_id = ? AND is_read = 0",
        )
        .bind(now_timestamp())
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn unread_count(&self, user_id: i64) -> DatabaseResult<i64> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = 0",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

fn map_notification(row: &SqliteRow) -> DatabaseResult<Notification> {
    Ok(Notification {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        is_read: row.try_get("is_read")?,
        created_at: row.try_get("created_at")?,
        read_at: row.try_get("read_at")?,
    })
}
