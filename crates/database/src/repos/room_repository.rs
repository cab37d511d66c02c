//! Room repository for database operations.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::entities::{Room, RoomKind};
use crate::repos::new_public_id;
use crate::types::{now_timestamp, DatabaseError, DatabaseResult};

const ROOM_SELECT: &str = "SELECT r.id, r.public_id, r.kind, r.participant_low, r.participant_high, \
     lo.public_id AS participant_low_public_id, hi.public_id AS participant_high_public_id, \
     r.created_at, r.last_message_at \
     FROM rooms r \
     JOIN users lo ON lo.id = r.participant_low \
     JOIN users hi ON hi.id = r.participant_high";

#[derive(Clone)]
pub struct RoomRepository {
    pool: SqlitePool,
}

impl RoomRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Return the room for the unordered pair and kind, creating it on first use.
    ///
    /// Concurrent first calls race on the UNIQUE constraint; the losers'
    /// inserts are ignored and everyone reads back the single winning row.
    pub async fn get_or_create(
        &self,
        user_a: i64,
        user_b: i64,
        kind: RoomKind,
    ) -> DatabaseResult<Room> {
        let (low, high) = if user_a < user_b {
            (user_a, user_b)
        } else {
            (user_b, user_a)
        };

        let result = sqlx::query(
            "INSERT INTO rooms (public_id, participant_low, participant_high, kind, created_at) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT (participant_low, participant_high, kind) DO NOTHING",
        )
        .bind(new_public_id())
        .bind(low)
        .bind(high)
        .bind(kind.as_str())
        .bind(now_timestamp())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            debug!(participant_low = low, participant_high = high, kind = %kind, "room created");
        }

        let row = sqlx::query(&format!(
            "{ROOM_SELECT} WHERE r.participant_low = ? AND r.participant_high = ? AND r.kind = ?"
        ))
        .bind(low)
        .bind(high)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref()
            .map(map_room)
            .transpose()?
            .ok_or_else(|| DatabaseError::NotFound(format!("room for {low}/{high}")))
    }

    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<Room>> {
        let row = sqlx::query(&format!("{ROOM_SELECT} WHERE r.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_room).transpose()
    }

    pub async fn find_by_public_id(&self, public_id: &str) -> DatabaseResult<Option<Room>> {
        let row = sqlx::query(&format!("{ROOM_SELECT} WHERE r.public_id = ?"))
            .bind(public_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_room).transpose()
    }

    /// Rooms the user participates in, most recently active first.
    pub async fn list_for_user(&self, user_id: i64) -> DatabaseResult<Vec<Room>> {
        let rows = sqlx::query(&format!(
            "{ROOM_SELECT} WHERE r.participant_low = ? OR r.participant_high = ? \
             ORDER BY COALESCE(r.last_message_at, r.created_at) DESC, r.id DESC"
        ))
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_room).collect()
    }

    pub async fn count(&self) -> DatabaseResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM rooms")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn map_room(row: &SqliteRow) -> DatabaseResult<Room> {
    let kind: String = row.try_get("kind")?;

    Ok(Room {
        id: row.try_get("id")?,
        public_id: row.try_get("public_id")?,
        kind: RoomKind::parse(&kind)
            .ok_or_else(|| DatabaseError::InvalidData(format!("room kind {kind}")))?,
        participant_low: row.try_get("participant_low")?,
        participant_high: row.try_get("participant_high")?,
        participant_low_public_id: row.try_get("participant_low_public_id")?,
        participant_high_public_id: row.try_get("participant_high_public_id")?,
        created_at: row.try_get("created_at")?,
        last_message_at: row.try_get("last_message_at")?,
    })
}
