pub mod cached_entry;
pub mod consumable_balance;
pub mod gate_decision;
pub mod subscription;
pub mod usage_record;

pub use cached_entry::CachedEntry;
pub use consumable_balance::ConsumableBalance;
pub use gate_decision::{AccessGrant, DecisionOutcome, GateDecision, UNVERIFIABLE_REASON};
pub use subscription::SubscriptionRecord;
pub use usage_record::UsageRecord;
