use crate::application::ports::{Clock, KeyValueStore};
use crate::domain::entities::UsageRecord;
use crate::domain::value_objects::{FeatureId, Limit, PeriodKey, Remaining, UsagePeriod};
use crate::shared::error::AppError;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const USAGE_SLOT_PREFIX: &str = "usage:";

/// 永続化形式。負数や範囲外の値も読み込み、書き込み経路で丸める。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredUsage {
    feature_id: FeatureId,
    period_key: PeriodKey,
    count: i64,
}

/// 機能ごと・期間ごとの利用回数カウンタ
pub struct UsageTrackerService {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    write_lock: Mutex<()>,
}

impl UsageTrackerService {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    fn slot(feature: FeatureId) -> String {
        format!("{USAGE_SLOT_PREFIX}{}", feature.as_str())
    }

    fn current_key(&self, feature: FeatureId) -> PeriodKey {
        let period = feature.period().unwrap_or(UsagePeriod::Daily);
        PeriodKey::for_instant(period, self.clock.now())
    }

    async fn load(&self, feature: FeatureId) -> Result<Option<UsageRecord>, AppError> {
        let Some(raw) = self.store.get(&Self::slot(feature)).await? else {
            return Ok(None);
        };
        match serde_json::from_str::<StoredUsage>(&raw) {
            Ok(stored) if stored.feature_id == feature => Ok(Some(UsageRecord::new(
                stored.feature_id,
                stored.period_key,
                stored.count,
            ))),
            Ok(_) => {
                tracing::warn!(feature = %feature, "usage slot belongs to another feature");
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(feature = %feature, error = %e, "discarding corrupt usage slot");
                Ok(None)
            }
        }
    }

    /// 現在期間の記録。期間が変わっていれば 0 から数え直す。
    pub async fn current(&self, feature: FeatureId) -> UsageRecord {
        let key = self.current_key(feature);
        match self.load(feature).await {
            Ok(Some(record)) => {
                let count = record.count_for(&key);
                UsageRecord::new(feature, key, i64::from(count))
            }
            Ok(None) => UsageRecord::empty(feature, key),
            Err(e) => {
                tracing::warn!(feature = %feature, error = %e, "failed to read usage slot");
                UsageRecord::empty(feature, key)
            }
        }
    }

    pub async fn used(&self, feature: FeatureId) -> u32 {
        self.current(feature).await.count
    }

    pub async fn remaining(&self, feature: FeatureId, limit: Limit) -> Remaining {
        limit.remaining_after(self.used(feature).await)
    }

    /// 利用を 1 回記録する。保存に失敗しても記録後の値を返す。
    pub async fn record_usage(&self, feature: FeatureId) -> UsageRecord {
        let _guard = self.write_lock.lock().await;
        let current = self.current(feature).await;
        self.increment(current).await
    }

    /// 上限に余りがある場合だけ 1 回記録する。上限に達していれば `None`。
    ///
    /// 残数の確認と書き込みは同じロック内で行う。
    pub async fn try_record_usage(&self, feature: FeatureId, limit: Limit) -> Option<UsageRecord> {
        let _guard = self.write_lock.lock().await;
        let current = self.current(feature).await;
        if !limit.remaining_after(current.count).is_available() {
            tracing::debug!(feature = %feature, used = current.count, "usage cap reached");
            return None;
        }
        Some(self.increment(current).await)
    }

    async fn increment(&self, current: UsageRecord) -> UsageRecord {
        let next = UsageRecord::new(
            current.feature_id,
            current.period_key,
            i64::from(current.count).saturating_add(1),
        );
        self.write(&next).await;
        next
    }

    async fn write(&self, record: &UsageRecord) {
        let raw = match serde_json::to_string(record) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(feature = %record.feature_id, error = %e, "failed to encode usage");
                return;
            }
        };
        if let Err(e) = self.store.set(&Self::slot(record.feature_id), &raw).await {
            tracing::warn!(feature = %record.feature_id, error = %e, "failed to persist usage");
        }
    }

    /// 全機能のカウンタを破棄する（ログアウト時）
    pub async fn clear(&self) {
        let _guard = self.write_lock.lock().await;
        let slots = match self.store.list_slots(USAGE_SLOT_PREFIX).await {
            Ok(slots) => slots,
            Err(e) => {
                tracing::warn!(error = %e, "failed to list usage slots");
                FeatureId::ALL.iter().map(|f| Self::slot(*f)).collect()
            }
        };
        for slot in slots {
            if let Err(e) = self.store.remove(&slot).await {
                tracing::warn!(slot = %slot, error = %e, "failed to remove usage slot");
            }
        }
    }
}
