pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;
pub mod state;

pub use application::services::{
    BalanceLedgerService, EntitlementOverview, FeatureGateService, FeatureLimitTable,
    PurchaseOutcome, SubscriptionStatusService, UpgradeHooks, UsageTrackerService,
    resolve_limits,
};
pub use domain::entities::{GateDecision, SubscriptionRecord};
pub use domain::value_objects::{ConsumableKind, FeatureId, Limit, PlanTier, ProductId, Remaining};
pub use shared::{AppConfig, AppError};
pub use state::AppState;

/// ログ設定の初期化（`RUST_LOG` があればそちらを優先）
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pawfect_gate=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
