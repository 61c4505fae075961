use sqlx::{Executor, SqlitePool, sqlite::SqlitePoolOptions};
use std::sync::Arc;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cache_slots (
    slot TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL,
    updated_at INTEGER NOT NULL
)
"#;

#[derive(Clone)]
pub struct ConnectionPool {
    pool: Arc<SqlitePool>,
}

impl ConnectionPool {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        Self::with_max_connections(database_url, 5).await
    }

    /// インメモリ DB は接続ごとに別物になるため 1 接続に固定する
    pub async fn from_memory() -> Result<Self, sqlx::Error> {
        Self::with_max_connections("sqlite::memory:", 1).await
    }

    async fn with_max_connections(database_url: &str, max: u32) -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max)
            .connect(database_url)
            .await?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    pub fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn initialize(&self) -> Result<(), sqlx::Error> {
        self.pool.execute(SCHEMA).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
