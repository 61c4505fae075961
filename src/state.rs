use crate::application::ports::{CheckoutFlow, Clock, EntitlementAuthority, KeyValueStore};
use crate::application::services::{
    BalanceLedgerService, FeatureGateService, SubscriptionStatusService, UpgradeHooks,
    UsageTrackerService,
};
use crate::infrastructure::{
    ConnectionPool, HttpEntitlementAuthority, MemoryKeyValueStore, SqliteKeyValueStore,
    SystemClock,
};
use crate::shared::config::AppConfig;
use anyhow::Context;
use std::sync::Arc;

/// プロセスごとに 1 つだけ構築するエンタイトルメント関連サービス群
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub subscriptions: Arc<SubscriptionStatusService>,
    pub ledger: BalanceLedgerService,
    pub usage: Arc<UsageTrackerService>,
    pub gate: Arc<FeatureGateService>,
    pub pool: Option<ConnectionPool>,
}

impl AppState {
    pub async fn from_config(config: AppConfig, hooks: UpgradeHooks) -> anyhow::Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

        let authority = Arc::new(
            HttpEntitlementAuthority::new(&config.authority)
                .context("Failed to build entitlement client")?,
        );

        let (store, pool): (Arc<dyn KeyValueStore>, Option<ConnectionPool>) =
            match config.storage.database_url.as_deref() {
                Some(url) => {
                    let pool = ConnectionPool::new(url)
                        .await
                        .with_context(|| format!("Failed to open {url}"))?;
                    pool.initialize()
                        .await
                        .context("Failed to initialize cache schema")?;
                    (Arc::new(SqliteKeyValueStore::new(pool.clone())), Some(pool))
                }
                None => (Arc::new(MemoryKeyValueStore::new()), None),
            };

        let mut state = Self::with_components(
            config,
            authority.clone(),
            authority,
            store,
            Arc::new(SystemClock),
            hooks,
        );
        state.pool = pool;
        tracing::info!(
            base_url = %state.config.authority.base_url,
            persistent = state.pool.is_some(),
            "entitlement services ready"
        );
        Ok(state)
    }

    pub fn with_components(
        config: AppConfig,
        authority: Arc<dyn EntitlementAuthority>,
        checkout: Arc<dyn CheckoutFlow>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        hooks: UpgradeHooks,
    ) -> Self {
        let subscriptions = Arc::new(SubscriptionStatusService::new(
            Arc::clone(&authority),
            Arc::clone(&store),
            Arc::clone(&clock),
            &config.cache,
        ));
        let ledger = BalanceLedgerService::new(
            Arc::clone(&authority),
            checkout,
            Arc::clone(&store),
            Arc::clone(&clock),
            &config.cache,
        );
        let usage = Arc::new(UsageTrackerService::new(store, Arc::clone(&clock)));
        let gate = Arc::new(FeatureGateService::new(
            Arc::clone(&subscriptions),
            ledger.clone(),
            Arc::clone(&usage),
            authority,
            clock,
            hooks,
        ));

        Self {
            config,
            subscriptions,
            ledger,
            usage,
            gate,
            pool: None,
        }
    }

    pub async fn shutdown(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
