use crate::domain::entities::SubscriptionRecord;
use crate::domain::value_objects::{FeatureId, FeatureLimit, Limit, PlanTier};
use crate::shared::error::AppError;
use serde::Serialize;
use std::collections::BTreeMap;

/// プランから導出した全機能分の上限表
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureLimitTable {
    pub plan: PlanTier,
    pub limits: BTreeMap<FeatureId, FeatureLimit>,
}

impl FeatureLimitTable {
    pub fn get(&self, feature: FeatureId) -> Option<&FeatureLimit> {
        self.limits.get(&feature)
    }

    pub fn limit(&self, feature: FeatureId) -> Result<Limit, AppError> {
        self.get(feature)
            .map(|entry| entry.limit)
            .ok_or_else(|| AppError::UnknownFeature(feature.as_str().to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureLimit> {
        self.limits.values()
    }
}

/// サブスクリプション状態から上限表を解決する（純粋関数）
///
/// 非アクティブな記録は `plan` に関係なく無料プランとして扱う。
pub fn resolve_limits(record: &SubscriptionRecord) -> FeatureLimitTable {
    limits_for_plan(record.effective_plan())
}

pub fn limits_for_plan(plan: PlanTier) -> FeatureLimitTable {
    let limits = FeatureId::ALL
        .iter()
        .map(|feature| (*feature, limit_for(plan, *feature)))
        .collect();
    FeatureLimitTable { plan, limits }
}

fn limit_for(plan: PlanTier, feature: FeatureId) -> FeatureLimit {
    use PlanTier::{Free, Premium, Ultimate};

    let quota = |limit| FeatureLimit::quota(feature, limit);
    let toggle = |granted| FeatureLimit::toggle(feature, granted);

    match feature {
        FeatureId::SwipesPerDay => quota(match plan {
            Free => Limit::Capped(50),
            Premium | Ultimate => Limit::Unlimited,
        }),
        FeatureId::LikesPerDay => quota(match plan {
            Free => Limit::Capped(100),
            Premium | Ultimate => Limit::Unlimited,
        }),
        FeatureId::SuperLikesPerDay => quota(match plan {
            Free => Limit::Disabled,
            Premium => Limit::Capped(5),
            Ultimate => Limit::Unlimited,
        }),
        FeatureId::BoostsPerMonth => quota(match plan {
            Free => Limit::Disabled,
            Premium => Limit::Capped(1),
            Ultimate => Limit::Capped(5),
        }),
        FeatureId::CanUndoSwipes | FeatureId::CanSeeWhoLiked | FeatureId::AdvancedFilters => {
            toggle(match plan {
                Free => false,
                Premium | Ultimate => true,
            })
        }
        FeatureId::PriorityMatching | FeatureId::UnlimitedRewind => toggle(match plan {
            Free | Premium => false,
            Ultimate => true,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_plan_limits() {
        let table = resolve_limits(&SubscriptionRecord::free());
        assert_eq!(table.plan, PlanTier::Free);
        assert_eq!(table.limit(FeatureId::SwipesPerDay).unwrap(), Limit::Capped(50));
        assert_eq!(table.limit(FeatureId::LikesPerDay).unwrap(), Limit::Capped(100));
        assert_eq!(table.limit(FeatureId::SuperLikesPerDay).unwrap(), Limit::Disabled);
        assert_eq!(table.limit(FeatureId::CanSeeWhoLiked).unwrap(), Limit::Disabled);
    }

    #[test]
    fn test_table_covers_every_feature() {
        for plan in PlanTier::ALL {
            let table = limits_for_plan(plan);
            assert_eq!(table.limits.len(), FeatureId::ALL.len());
            for feature in FeatureId::ALL {
                let entry = table.get(feature).unwrap();
                assert_eq!(entry.is_boolean_feature, feature.is_boolean());
            }
        }
    }

    #[test]
    fn test_limits_are_monotonic_across_tiers() {
        let free = limits_for_plan(PlanTier::Free);
        let premium = limits_for_plan(PlanTier::Premium);
        let ultimate = limits_for_plan(PlanTier::Ultimate);

        for feature in FeatureId::ALL {
            let f = free.limit(feature).unwrap();
            let p = premium.limit(feature).unwrap();
            let u = ultimate.limit(feature).unwrap();
            assert!(f <= p, "{feature}: free {f} > premium {p}");
            assert!(p <= u, "{feature}: premium {p} > ultimate {u}");
        }
    }

    #[test]
    fn test_inactive_subscription_resolves_to_free() {
        let record = SubscriptionRecord {
            is_active: false,
            ..SubscriptionRecord::active(PlanTier::Ultimate)
        };
        assert_eq!(resolve_limits(&record), limits_for_plan(PlanTier::Free));
    }

    #[test]
    fn test_ultimate_only_features() {
        let premium = limits_for_plan(PlanTier::Premium);
        let ultimate = limits_for_plan(PlanTier::Ultimate);
        assert!(!premium.limit(FeatureId::PriorityMatching).unwrap().is_granted());
        assert!(ultimate.limit(FeatureId::PriorityMatching).unwrap().is_granted());
        assert_eq!(ultimate.limit(FeatureId::BoostsPerMonth).unwrap(), Limit::Capped(5));
    }
}
