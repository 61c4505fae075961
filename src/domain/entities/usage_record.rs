use crate::domain::value_objects::{FeatureId, PeriodKey};
use serde::{Deserialize, Serialize};

/// 機能ごと・期間ごとの利用回数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub feature_id: FeatureId,
    pub period_key: PeriodKey,
    pub count: u32,
}

impl UsageRecord {
    /// 永続化値が負でも 0 に丸める
    pub fn new(feature_id: FeatureId, period_key: PeriodKey, count: i64) -> Self {
        Self {
            feature_id,
            period_key,
            count: count.clamp(0, u32::MAX as i64) as u32,
        }
    }

    pub fn empty(feature_id: FeatureId, period_key: PeriodKey) -> Self {
        Self::new(feature_id, period_key, 0)
    }

    /// 指定期間での有効カウント。期間が異なれば 0。
    pub fn count_for(&self, period_key: &PeriodKey) -> u32 {
        if &self.period_key == period_key { self.count } else { 0 }
    }
}
