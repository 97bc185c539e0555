//! SQLite directory repository implementation.
//!
//! Implements `DirectoryRepository` from `confab-core`. User rows are
//! created by the external account system; this repository reads them and
//! writes the two presence columns.

use chrono::{DateTime, Utc};
use confab_core::repository::DirectoryRepository;
use confab_types::error::RepositoryError;
use confab_types::user::{UserId, UserProfile};
use sqlx::Row;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `DirectoryRepository`.
pub struct SqliteDirectoryRepository {
    pool: DatabasePool,
}

impl SqliteDirectoryRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

pub(crate) struct UserRow {
    pub id: String,
    pub username: String,
    pub is_online: bool,
    pub last_active: String,
}

impl UserRow {
    pub(crate) fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            is_online: row.try_get("is_online")?,
            last_active: row.try_get("last_active")?,
        })
    }

    pub(crate) fn into_profile(self) -> Result<UserProfile, RepositoryError> {
        Ok(UserProfile {
            id: parse_user_id(&self.id)?,
            username: self.username,
            is_online: self.is_online,
            last_active: parse_datetime(&self.last_active)?,
        })
    }
}

pub(crate) fn parse_user_id(s: &str) -> Result<UserId, RepositoryError> {
    s.parse::<UserId>()
        .map_err(|e| RepositoryError::Query(format!("invalid user id: {e}")))
}

pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

// ---------------------------------------------------------------------------
// DirectoryRepository impl
// ---------------------------------------------------------------------------

impl DirectoryRepository for SqliteDirectoryRepository {
    async fn find_user(&self, id: UserId) -> Result<Option<UserProfile>, RepositoryError> {
        let row = sqlx::query("SELECT id, username, is_online, last_active FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let user = UserRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?
                    .into_profile()?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    async fn set_presence(
        &self,
        id: UserId,
        online: bool,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE users SET is_online = ?, last_active = ? WHERE id = ?")
            .bind(online)
            .bind(format_datetime(&at))
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
