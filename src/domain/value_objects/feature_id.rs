use super::consumable::ConsumableKind;
use super::period::UsagePeriod;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown feature id: {0}")]
pub struct ParseFeatureError(pub String);

/// ゲート対象となる機能の識別子
///
/// 機能の追加・削除はこの列挙と `feature_limits` の対応表を同時に変更する必要がある。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeatureId {
    SwipesPerDay,
    LikesPerDay,
    SuperLikesPerDay,
    BoostsPerMonth,
    CanUndoSwipes,
    CanSeeWhoLiked,
    AdvancedFilters,
    PriorityMatching,
    UnlimitedRewind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    /// 期間ごとの上限回数で制御する機能
    Quota(UsagePeriod),
    /// 付与の有無のみで制御する機能
    Boolean,
}

/// アップグレード誘導に表示する文言
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpgradeCopy {
    pub title: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
}

impl FeatureId {
    pub const ALL: [FeatureId; 9] = [
        FeatureId::SwipesPerDay,
        FeatureId::LikesPerDay,
        FeatureId::SuperLikesPerDay,
        FeatureId::BoostsPerMonth,
        FeatureId::CanUndoSwipes,
        FeatureId::CanSeeWhoLiked,
        FeatureId::AdvancedFilters,
        FeatureId::PriorityMatching,
        FeatureId::UnlimitedRewind,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureId::SwipesPerDay => "swipesPerDay",
            FeatureId::LikesPerDay => "likesPerDay",
            FeatureId::SuperLikesPerDay => "superLikesPerDay",
            FeatureId::BoostsPerMonth => "boostsPerMonth",
            FeatureId::CanUndoSwipes => "canUndoSwipes",
            FeatureId::CanSeeWhoLiked => "canSeeWhoLiked",
            FeatureId::AdvancedFilters => "advancedFilters",
            FeatureId::PriorityMatching => "priorityMatching",
            FeatureId::UnlimitedRewind => "unlimitedRewind",
        }
    }

    pub fn kind(&self) -> FeatureKind {
        match self {
            FeatureId::SwipesPerDay | FeatureId::LikesPerDay | FeatureId::SuperLikesPerDay => {
                FeatureKind::Quota(UsagePeriod::Daily)
            }
            FeatureId::BoostsPerMonth => FeatureKind::Quota(UsagePeriod::Monthly),
            FeatureId::CanUndoSwipes
            | FeatureId::CanSeeWhoLiked
            | FeatureId::AdvancedFilters
            | FeatureId::PriorityMatching
            | FeatureId::UnlimitedRewind => FeatureKind::Boolean,
        }
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self.kind(), FeatureKind::Boolean)
    }

    /// 集計期間（ブール機能は `None`）
    pub fn period(&self) -> Option<UsagePeriod> {
        match self.kind() {
            FeatureKind::Quota(period) => Some(period),
            FeatureKind::Boolean => None,
        }
    }

    /// プランで許可されない場合に代替として消費できるアイテム
    pub fn consumable_escape_hatch(&self) -> Option<ConsumableKind> {
        match self {
            FeatureId::SuperLikesPerDay => Some(ConsumableKind::SuperLike),
            FeatureId::BoostsPerMonth => Some(ConsumableKind::Boost),
            FeatureId::AdvancedFilters => Some(ConsumableKind::FilterPass),
            FeatureId::SwipesPerDay
            | FeatureId::LikesPerDay
            | FeatureId::CanUndoSwipes
            | FeatureId::CanSeeWhoLiked
            | FeatureId::PriorityMatching
            | FeatureId::UnlimitedRewind => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FeatureId::SwipesPerDay => "swipes",
            FeatureId::LikesPerDay => "likes",
            FeatureId::SuperLikesPerDay => "super likes",
            FeatureId::BoostsPerMonth => "boosts",
            FeatureId::CanUndoSwipes => "undo swipe",
            FeatureId::CanSeeWhoLiked => "see who liked you",
            FeatureId::AdvancedFilters => "advanced filters",
            FeatureId::PriorityMatching => "priority matching",
            FeatureId::UnlimitedRewind => "unlimited rewind",
        }
    }

    pub fn upgrade_copy(&self) -> UpgradeCopy {
        match self {
            FeatureId::SwipesPerDay => UpgradeCopy {
                title: "Unlimited Swipes",
                description: "You've used all of today's swipes. Upgrade for unlimited swiping.",
                icon: "heart",
            },
            FeatureId::LikesPerDay => UpgradeCopy {
                title: "Unlimited Likes",
                description: "You've run out of likes for today. Upgrade to keep liking.",
                icon: "thumbs-up",
            },
            FeatureId::SuperLikesPerDay => UpgradeCopy {
                title: "Super Likes",
                description: "Stand out with Super Likes. Upgrade or grab a Super Like pack.",
                icon: "star",
            },
            FeatureId::BoostsPerMonth => UpgradeCopy {
                title: "Profile Boost",
                description: "Be seen by more pets nearby. Upgrade or buy a Boost.",
                icon: "flash",
            },
            FeatureId::CanUndoSwipes => UpgradeCopy {
                title: "Undo Swipes",
                description: "Take back an accidental pass with a Premium plan.",
                icon: "arrow-undo",
            },
            FeatureId::CanSeeWhoLiked => UpgradeCopy {
                title: "See Who Liked You",
                description: "Find out who already likes your pet with Premium.",
                icon: "eye",
            },
            FeatureId::AdvancedFilters => UpgradeCopy {
                title: "Advanced Filters",
                description: "Filter by breed, size and energy level with Premium.",
                icon: "options",
            },
            FeatureId::PriorityMatching => UpgradeCopy {
                title: "Priority Matching",
                description: "Get shown first to compatible pets with Ultimate.",
                icon: "rocket",
            },
            FeatureId::UnlimitedRewind => UpgradeCopy {
                title: "Unlimited Rewind",
                description: "Rewind as many swipes as you like with Ultimate.",
                icon: "refresh",
            },
        }
    }
}

impl FromStr for FeatureId {
    type Err = ParseFeatureError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        FeatureId::ALL
            .iter()
            .copied()
            .find(|feature| feature.as_str() == value)
            .ok_or_else(|| ParseFeatureError(value.to_string()))
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_id_round_trips_through_str() {
        for feature in FeatureId::ALL {
            assert_eq!(feature.as_str().parse::<FeatureId>().unwrap(), feature);
        }
    }

    /// 列挙子の位置。ワイルドカードを使わないため、列挙子を足すとここでコンパイルが止まる。
    fn position(feature: FeatureId) -> usize {
        match feature {
            FeatureId::SwipesPerDay => 0,
            FeatureId::LikesPerDay => 1,
            FeatureId::SuperLikesPerDay => 2,
            FeatureId::BoostsPerMonth => 3,
            FeatureId::CanUndoSwipes => 4,
            FeatureId::CanSeeWhoLiked => 5,
            FeatureId::AdvancedFilters => 6,
            FeatureId::PriorityMatching => 7,
            FeatureId::UnlimitedRewind => 8,
        }
    }

    #[test]
    fn test_all_lists_every_variant_once_in_order() {
        for (index, feature) in FeatureId::ALL.iter().enumerate() {
            assert_eq!(position(*feature), index, "{feature} is out of place in ALL");
        }
        assert_eq!(FeatureId::ALL.len(), position(FeatureId::UnlimitedRewind) + 1);
    }

    #[test]
    fn test_unknown_feature_is_rejected() {
        let err = "teleport".parse::<FeatureId>().unwrap_err();
        assert_eq!(err, ParseFeatureError("teleport".to_string()));
    }

    #[test]
    fn test_escape_hatches() {
        assert_eq!(
            FeatureId::SuperLikesPerDay.consumable_escape_hatch(),
            Some(ConsumableKind::SuperLike)
        );
        assert_eq!(
            FeatureId::AdvancedFilters.consumable_escape_hatch(),
            Some(ConsumableKind::FilterPass)
        );
        assert_eq!(FeatureId::SwipesPerDay.consumable_escape_hatch(), None);
    }

    #[test]
    fn test_serde_uses_camel_case_ids() {
        let json = serde_json::to_string(&FeatureId::CanSeeWhoLiked).unwrap();
        assert_eq!(json, "\"canSeeWhoLiked\"");
    }
}
