use crate::shared::error::AppError;
use async_trait::async_trait;

/// プロセス再起動をまたいで残る名前付きスロット
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, slot: &str) -> Result<Option<String>, AppError>;

    async fn set(&self, slot: &str, value: &str) -> Result<(), AppError>;

    async fn remove(&self, slot: &str) -> Result<(), AppError>;

    /// 接頭辞に一致するスロット名を列挙
    async fn list_slots(&self, prefix: &str) -> Result<Vec<String>, AppError>;
}
