use crate::application::ports::KeyValueStore;
use crate::infrastructure::database::ConnectionPool;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

/// `cache_slots` テーブルに保存する永続スロットストア
#[derive(Clone)]
pub struct SqliteKeyValueStore {
    pool: ConnectionPool,
}

impl SqliteKeyValueStore {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &SqlitePool {
        self.pool.get_pool()
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn get(&self, slot: &str) -> Result<Option<String>, AppError> {
        let row = sqlx::query("SELECT value FROM cache_slots WHERE slot = ?1")
            .bind(slot)
            .fetch_optional(self.pool())
            .await?;

        match row {
            Some(row) => Ok(Some(row.try_get("value")?)),
            None => Ok(None),
        }
    }

    async fn set(&self, slot: &str, value: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO cache_slots (slot, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(slot) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(slot)
        .bind(value)
        .bind(Utc::now().timestamp_millis())
        .execute(self.pool())
        .await?;

        Ok(())
    }

    async fn remove(&self, slot: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM cache_slots WHERE slot = ?1")
            .bind(slot)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    async fn list_slots(&self, prefix: &str) -> Result<Vec<String>, AppError> {
        let rows = sqlx::query(
            "SELECT slot FROM cache_slots WHERE substr(slot, 1, ?2) = ?1 ORDER BY slot",
        )
        .bind(prefix)
        .bind(prefix.chars().count() as i64)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter()
            .map(|row| row.try_get::<String, _>("slot").map_err(AppError::from))
            .collect()
    }
}
