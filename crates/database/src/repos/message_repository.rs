//! Message repository for database operations.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::entities::{Message, MessageType};
use crate::types::{now_timestamp, DatabaseError, DatabaseResult};

const MESSAGE_SELECT: &str = "SELECT m.id, m.room_id, r.public_id AS room_public_id, m.sender_id, \
     u.public_id AS sender_public_id, u.display_name AS sender_display_name, \
     m.content, m.message_type, m.created_at \
     FROM messages m \
     JOIN rooms r ON r.id = m.room_id \
     JOIN users u ON u.id = m.sender_id";

#[derive(Clone)]
pub struct MessageRepository {
    pool: SqlitePool,
}

impl MessageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a message and bump the room's activity timestamp atomically.
    pub async fn append(
        &self,
        room_id: i64,
        sender_id: i64,
        content: &str,
        message_type: MessageType,
    ) -> DatabaseResult<Message> {
        let now = now_timestamp();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO messages (room_id, sender_id, content, message_type, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(room_id)
        .bind(sender_id)
        .bind(content)
        .bind(message_type.as_str())
        .bind(&now)
        .execute(&mut *tx)
        .await?;
        let message_id = result.last_insert_rowid();

        sqlx::query("UPDATE rooms SET last_message_at = ? WHERE id = ?")
            .bind(&now)
            .bind(room_id)
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query(&format!("{MESSAGE_SELECT} WHERE m.id = ?"))
            .bind(message_id)
            .fetch_optional(&mut *tx)
            .await?;

        tx.commit().await?;

        row.as_ref()
            .map(map_message)
            .transpose()?
            .ok_or_else(|| DatabaseError::NotFound(format!("message {message_id}")))
    }

    /// The newest `limit` messages strictly older than `before`, returned
    /// oldest first.
    pub async fn list_for_room(
        &self,
        room_id: i64,
        before: Option<i64>,
        limit: u32,
    ) -> DatabaseResult<Vec<Message>> {
        let rows = sqlx::query(&format!(
            "{MESSAGE_SELECT} WHERE m.room_id = ? AND (? IS NULL OR m.id < ?) \
             ORDER BY m.id DESC LIMIT ?"
        ))
        .bind(room_id)
        .bind(before)
        .bind(before)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        let mut messages = rows.iter().map(map_message).collect::<DatabaseResult<Vec<_>>>()?;
        messages.reverse();
        Ok(messages)
    }

    pub async fn count_for_room(&self, room_id: i64) -> DatabaseResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE room_id = ?")
            .bind(room_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn map_message(row: &SqliteRow) -> DatabaseResult<Message> {
    let message_type: String = row.try_get("message_type")?;

    Ok(Message {
        id: row.try_get("id")?,
        room_id: row.try_get("room_id")?,
        room_public_id: row.try_get("room_public_id")?,
        sender_id: row.try_get("sender_id")?,
        sender_public_id: row.try_get("sender_public_id")?,
        sender_display_name: row.try_get("sender_display_name")?,
        content: row.try_get("content")?,
        message_type: MessageType::parse(&message_type).ok_or_else(|| {
            DatabaseError::InvalidData(format!("message type {message_type}"))
        })?,
        created_at: row.try_get("created_at")?,
    })
}
