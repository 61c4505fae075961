use serde::{Deserialize, Serialize};
use std::fmt;

/// サブスクリプションのプラン階層
///
/// `Ord` は `Free < Premium < Ultimate` の順で、上位プランほど大きい。
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    #[default]
    Free,
    Premium,
    Ultimate,
}

impl PlanTier {
    pub const ALL: [PlanTier; 3] = [PlanTier::Free, PlanTier::Premium, PlanTier::Ultimate];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Premium => "premium",
            PlanTier::Ultimate => "ultimate",
        }
    }

    pub fn is_paid(&self) -> bool {
        !matches!(self, PlanTier::Free)
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiers_are_ordered() {
        assert!(PlanTier::Free < PlanTier::Premium);
        assert!(PlanTier::Premium < PlanTier::Ultimate);
    }

    #[test]
    fn test_plan_deserializes_lowercase() {
        let plan: PlanTier = serde_json::from_str("\"ultimate\"").unwrap();
        assert_eq!(plan, PlanTier::Ultimate);
        assert!(serde_json::from_str::<PlanTier>("\"platinum\"").is_err());
    }
}
