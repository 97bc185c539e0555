//! Shared helpers for the SQLite repository tests.

use chrono::Utc;
use confab_types::user::UserId;

use super::pool::DatabasePool;

pub(crate) async fn test_pool() -> DatabasePool {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let url = format!("sqlite://{}?mode=rwc", db_path.display());
    std::mem::forget(dir);
    DatabasePool::new(&url).await.unwrap()
}

pub(crate) async fn insert_user(pool: &DatabasePool, username: &str) -> UserId {
    let id = UserId::new();
    sqlx::query("INSERT INTO users (id, username, is_online, last_active) VALUES (?, ?, 0, ?)")
        .bind(id.to_string())
        .bind(username)
        .bind(Utc::now().to_rfc3339())
        .execute(&pool.writer)
        .await
        .unwrap();
    id
}
