use crate::domain::entities::{ConsumableBalance, SubscriptionRecord};
use crate::domain::value_objects::{ConsumableKind, FeatureId};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// サブスクリプション状態と消費型アイテム残高の正となるリモート API
///
/// 非 2xx 応答や形状検証に失敗したペイロードはすべて `Err` として返す。
#[async_trait]
pub trait EntitlementAuthority: Send + Sync {
    async fn fetch_subscription(&self) -> Result<SubscriptionRecord, AppError>;

    async fn fetch_balance(&self) -> Result<ConsumableBalance, AppError>;

    async fn report_consumption(
        &self,
        kind: ConsumableKind,
        quantity: u32,
    ) -> Result<(), AppError>;

    async fn cancel_subscription(&self) -> Result<(), AppError>;

    async fn track_usage(&self, feature: FeatureId, at: DateTime<Utc>) -> Result<(), AppError>;
}
