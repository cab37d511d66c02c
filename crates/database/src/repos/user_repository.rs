//! User repository for database operations.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::entities::{User, UserRole};
use crate::repos::new_public_id;
use crate::types::{now_timestamp, DatabaseError, DatabaseResult};

const USER_COLUMNS: &str = "id, public_id, display_name, role, created_at, updated_at";

#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a user. Accounts normally come from the account service; this
    /// path exists for seeding and development tokens.
    pub async fn create(&self, display_name: &str, role: UserRole) -> DatabaseResult<User> {
        let public_id = new_public_id();
        let now = now_timestamp();

        let result = sqlx::query(
            "INSERT INTO users (public_id, display_name, role, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(display_name)
        .bind(role.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.find_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("user {public_id}")))
    }

    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_user).transpose()
    }

    pub async fn find_by_public_id(&self, public_id: &str) -> DatabaseResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE public_id = ?"
        ))
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_user).transpose()
    }
}

fn map_user(row: &SqliteRow) -> DatabaseResult<User> {
    let role: String = row.try_get("role")?;

    Ok(User {
        id: row.try_get("id")?,
        public_id: row.try_get("public_id")?,
        display_name: row.try_get("display_name")?,
        role: UserRole::parse(&role)
            .ok_or_else(|| DatabaseError::InvalidData(format!("user role {role}")))?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
