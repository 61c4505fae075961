use crate::domain::value_objects::PlanTier;
use crate::shared::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// リモートから取得したサブスクリプション状態
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRecord {
    pub is_active: bool,
    pub plan: PlanTier,
    #[serde(default)]
    pub features: BTreeSet<String>,
    #[serde(default)]
    pub auto_renew: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_period_end: Option<DateTime<Utc>>,
}

impl SubscriptionRecord {
    pub fn free() -> Self {
        Self {
            is_active: false,
            plan: PlanTier::Free,
            features: BTreeSet::new(),
            auto_renew: false,
            expires_at: None,
            current_period_end: None,
        }
    }

    pub fn active(plan: PlanTier) -> Self {
        Self {
            is_active: true,
            plan,
            auto_renew: true,
            ..Self::free()
        }
    }

    /// 権限計算に使うプラン。非アクティブなら `plan` の値に関係なく無料プラン扱い。
    pub fn effective_plan(&self) -> PlanTier {
        if self.is_active { self.plan } else { PlanTier::Free }
    }

    pub fn has_active_subscription(&self) -> bool {
        self.effective_plan().is_paid()
    }

    /// 有効期間中だが自動更新が停止されている
    pub fn is_cancelled(&self) -> bool {
        self.is_active && !self.auto_renew
    }

    pub fn has_feature(&self, name: &str) -> bool {
        self.is_active && (self.features.contains(name) || self.features.contains("all"))
    }

    pub fn days_until_renewal(&self, now: DateTime<Utc>) -> Option<i64> {
        let renews_at = self.current_period_end.or(self.expires_at)?;
        if !self.is_active {
            return None;
        }
        Some((renews_at - now).num_days().max(0))
    }

    /// 形状チェック（リモート応答の検証に使う）
    pub fn validate(&self) -> Result<(), AppError> {
        if self.features.iter().any(|feature| feature.trim().is_empty()) {
            return Err(AppError::MalformedResponse(
                "subscription features must not contain empty entries".to_string(),
            ));
        }
        if let (Some(expires_at), Some(period_end)) = (self.expires_at, self.current_period_end) {
            if period_end > expires_at && !self.auto_renew {
                return Err(AppError::MalformedResponse(
                    "currentPeriodEnd is after expiresAt on a non-renewing subscription"
                        .to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl Default for SubscriptionRecord {
    fn default() -> Self {
        Self::free()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_inactive_record_behaves_as_free() {
        let record = SubscriptionRecord {
            is_active: false,
            ..SubscriptionRecord::active(PlanTier::Ultimate)
        };
        assert_eq!(record.effective_plan(), PlanTier::Free);
        assert!(!record.has_active_subscription());
    }

    #[test]
    fn test_deserializes_wire_shape() {
        let record: SubscriptionRecord = serde_json::from_str(
            r#"{"isActive":true,"plan":"premium","features":["see_who_liked"],"autoRenew":false}"#,
        )
        .unwrap();
        assert_eq!(record.plan, PlanTier::Premium);
        assert!(record.is_cancelled());
        assert!(record.has_feature("see_who_liked"));
        assert!(record.expires_at.is_none());
    }

    #[test]
    fn test_days_until_renewal() {
        let now = Utc::now();
        let record = SubscriptionRecord {
            current_period_end: Some(now + Duration::days(25) + Duration::hours(1)),
            ..SubscriptionRecord::active(PlanTier::Premium)
        };
        assert_eq!(record.days_until_renewal(now), Some(25));
        assert_eq!(SubscriptionRecord::free().days_until_renewal(now), None);
    }

    #[test]
    fn test_validate_rejects_empty_feature_names() {
        let mut record = SubscriptionRecord::active(PlanTier::Premium);
        record.features.insert(" ".to_string());
        assert!(matches!(
            record.validate(),
            Err(AppError::MalformedResponse(_))
        ));
    }
}
