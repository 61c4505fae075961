pub mod balance_ledger;
pub mod feature_gate;
pub mod feature_limits;
pub mod subscription_status;
pub mod usage_tracker;

pub use balance_ledger::{BalanceLedgerService, PurchaseOutcome};
pub use feature_gate::{EntitlementOverview, FeatureGateService, FeatureUsage, UpgradeHooks};
pub use feature_limits::{FeatureLimitTable, limits_for_plan, resolve_limits};
pub use subscription_status::SubscriptionStatusService;
pub use usage_tracker::UsageTrackerService;
