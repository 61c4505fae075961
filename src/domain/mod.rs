pub mod entities;
pub mod value_objects;

pub use entities::{
    AccessGrant, CachedEntry, ConsumableBalance, DecisionOutcome, GateDecision,
    SubscriptionRecord, UsageRecord,
};
pub use value_objects::{
    ConsumableKind, FeatureId, FeatureLimit, Limit, PeriodKey, PlanTier, ProductId, Remaining,
    UsagePeriod,
};
