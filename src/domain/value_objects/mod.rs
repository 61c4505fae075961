pub mod consumable;
pub mod feature_id;
pub mod limit;
pub mod period;
pub mod plan_tier;
pub mod product;

pub use consumable::ConsumableKind;
pub use feature_id::{FeatureId, FeatureKind, ParseFeatureError, UpgradeCopy};
pub use limit::{FeatureLimit, Limit, ParseLimitError, Remaining, UNLIMITED_RAW};
pub use period::{PeriodKey, UsagePeriod};
pub use plan_tier::PlanTier;
pub use product::{ProductGrant, ProductId};
