use super::feature_id::FeatureId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

pub const UNLIMITED_RAW: i64 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid limit value: {0}")]
pub struct ParseLimitError(pub i64);

/// 機能の上限値
///
/// 比較順序は `Disabled < Capped(n) < Unlimited`。外部表現は
/// `0` = 無効、`N > 0` = 期間あたりの上限、`-1` = 無制限。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Limit {
    Disabled,
    Capped(u32),
    Unlimited,
}

impl Limit {
    pub fn from_raw(raw: i64) -> Result<Self, ParseLimitError> {
        match raw {
            UNLIMITED_RAW => Ok(Limit::Unlimited),
            0 => Ok(Limit::Disabled),
            n if n > 0 && n <= u32::MAX as i64 => Ok(Limit::Capped(n as u32)),
            other => Err(ParseLimitError(other)),
        }
    }

    pub fn capped(n: u32) -> Self {
        if n == 0 { Limit::Disabled } else { Limit::Capped(n) }
    }

    pub fn as_raw(&self) -> i64 {
        match self {
            Limit::Disabled => 0,
            Limit::Capped(n) => *n as i64,
            Limit::Unlimited => UNLIMITED_RAW,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        matches!(self, Limit::Unlimited)
    }

    /// ブール機能として付与されているか
    pub fn is_granted(&self) -> bool {
        !matches!(self, Limit::Disabled)
    }

    pub fn remaining_after(&self, used: u32) -> Remaining {
        match self {
            Limit::Unlimited => Remaining::Unlimited,
            Limit::Disabled => Remaining::Count(0),
            Limit::Capped(cap) => Remaining::Count(cap.saturating_sub(used)),
        }
    }
}

impl Serialize for Limit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_raw())
    }
}

impl<'de> Deserialize<'de> for Limit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        Limit::from_raw(raw).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Disabled => f.write_str("disabled"),
            Limit::Capped(n) => write!(f, "{n}"),
            Limit::Unlimited => f.write_str("unlimited"),
        }
    }
}

/// 残り利用可能回数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Remaining {
    Unlimited,
    Count(u32),
}

impl Remaining {
    pub fn is_available(&self) -> bool {
        match self {
            Remaining::Unlimited => true,
            Remaining::Count(n) => *n > 0,
        }
    }
}

/// プランから導出された 1 機能分の上限
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureLimit {
    pub feature_id: FeatureId,
    pub limit: Limit,
    pub is_boolean_feature: bool,
}

impl FeatureLimit {
    pub fn quota(feature_id: FeatureId, limit: Limit) -> Self {
        Self {
            feature_id,
            limit,
            is_boolean_feature: false,
        }
    }

    pub fn toggle(feature_id: FeatureId, granted: bool) -> Self {
        Self {
            feature_id,
            limit: if granted {
                Limit::Unlimited
            } else {
                Limit::Disabled
            },
            is_boolean_feature: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_ordering_treats_unlimited_as_largest() {
        assert!(Limit::Disabled < Limit::Capped(1));
        assert!(Limit::Capped(1) < Limit::Capped(500));
        assert!(Limit::Capped(u32::MAX) < Limit::Unlimited);
    }

    #[test]
    fn test_from_raw_rejects_other_negatives() {
        assert_eq!(Limit::from_raw(-1), Ok(Limit::Unlimited));
        assert_eq!(Limit::from_raw(0), Ok(Limit::Disabled));
        assert_eq!(Limit::from_raw(7), Ok(Limit::Capped(7)));
        assert_eq!(Limit::from_raw(-5), Err(ParseLimitError(-5)));
    }

    #[test]
    fn test_remaining_never_goes_below_zero() {
        assert_eq!(Limit::Capped(3).remaining_after(10), Remaining::Count(0));
        assert_eq!(Limit::Capped(3).remaining_after(1), Remaining::Count(2));
        assert_eq!(Limit::Unlimited.remaining_after(1000), Remaining::Unlimited);
        assert_eq!(Limit::Disabled.remaining_after(0), Remaining::Count(0));
    }

    #[test]
    fn test_limit_serializes_as_raw_integer() {
        assert_eq!(serde_json::to_string(&Limit::Unlimited).unwrap(), "-1");
        let parsed: Limit = serde_json::from_str("5").unwrap();
        assert_eq!(parsed, Limit::Capped(5));
    }
}
