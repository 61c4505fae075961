use crate::application::ports::{Clock, EntitlementAuthority, KeyValueStore};
use crate::domain::entities::SubscriptionRecord;
use crate::infrastructure::cache::{CacheRead, Fetcher, SingleFlightCache};
use crate::shared::config::CacheConfig;
use crate::shared::error::AppError;
use futures::FutureExt;
use std::sync::Arc;

pub const SUBSCRIPTION_SLOT: &str = "subscription";

/// サブスクリプション状態のキャッシュ付き参照
pub struct SubscriptionStatusService {
    authority: Arc<dyn EntitlementAuthority>,
    cache: SingleFlightCache<SubscriptionRecord>,
}

impl SubscriptionStatusService {
    pub fn new(
        authority: Arc<dyn EntitlementAuthority>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        config: &CacheConfig,
    ) -> Self {
        let fetch_authority = Arc::clone(&authority);
        let fetcher: Fetcher<SubscriptionRecord> = Arc::new(move || {
            let authority = Arc::clone(&fetch_authority);
            async move {
                let record = authority.fetch_subscription().await?;
                record.validate()?;
                Ok(record)
            }
            .boxed()
        });

        let cache = SingleFlightCache::new(
            SUBSCRIPTION_SLOT,
            config.subscription_ttl(),
            config.fetch_timeout(),
            store,
            clock,
            SubscriptionRecord::free(),
            fetcher,
        );

        Self { authority, cache }
    }

    /// 有効期間内ならキャッシュを、そうでなければ権威から取得した状態を返す。
    /// 取得失敗時は直近の値、それもなければ無料プランを返す（`source` で区別できる）。
    pub async fn get_status(&self) -> CacheRead<SubscriptionRecord> {
        self.cache.get().await
    }

    pub async fn has_active_subscription(&self) -> bool {
        self.get_status().await.value.has_active_subscription()
    }

    pub async fn invalidate(&self) {
        self.cache.invalidate().await;
    }

    pub async fn clear(&self) {
        self.cache.clear().await;
    }

    pub async fn last_error(&self) -> Option<AppError> {
        self.cache.last_error().await
    }

    /// 解約を依頼し、成功時はキャッシュを無効化する
    pub async fn cancel_subscription(&self) -> Result<(), AppError> {
        self.authority.cancel_subscription().await?;
        tracing::info!("subscription cancellation accepted");
        self.cache.invalidate().await;
        Ok(())
    }
}
