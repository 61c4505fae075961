use crate::application::ports::{
    Clock, EntitlementAuthority, UpgradeNavigator, UpgradePromptPresenter,
};
use crate::application::services::balance_ledger::BalanceLedgerService;
use crate::application::services::feature_limits::{FeatureLimitTable, resolve_limits};
use crate::application::services::subscription_status::SubscriptionStatusService;
use crate::application::services::usage_tracker::UsageTrackerService;
use crate::domain::entities::{AccessGrant, ConsumableBalance, GateDecision};
use crate::domain::value_objects::{FeatureId, Limit, PlanTier, Remaining};
use crate::shared::error::AppError;
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// アクセス拒否時に呼び出し側の UI へ渡す副作用
#[derive(Clone)]
pub struct UpgradeHooks {
    pub presenter: Arc<dyn UpgradePromptPresenter>,
    pub navigator: Arc<dyn UpgradeNavigator>,
    pub navigation_delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureUsage {
    pub feature_id: FeatureId,
    pub limit: Limit,
    pub is_boolean_feature: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<Remaining>,
}

/// 現在のエンタイトルメントの一覧（設定画面などの表示用）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementOverview {
    pub plan: PlanTier,
    pub is_active: bool,
    pub is_cancelled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_until_renewal: Option<i64>,
    pub balance: ConsumableBalance,
    pub features: Vec<FeatureUsage>,
    /// 権威に問い合わせできず直近値または既定値で表示している
    pub degraded: bool,
}

/// プラン・消費型アイテム・利用回数をまとめて機能の利用可否を判定する
pub struct FeatureGateService {
    subscriptions: Arc<SubscriptionStatusService>,
    ledger: BalanceLedgerService,
    usage: Arc<UsageTrackerService>,
    authority: Arc<dyn EntitlementAuthority>,
    clock: Arc<dyn Clock>,
    hooks: UpgradeHooks,
}

impl FeatureGateService {
    pub fn new(
        subscriptions: Arc<SubscriptionStatusService>,
        ledger: BalanceLedgerService,
        usage: Arc<UsageTrackerService>,
        authority: Arc<dyn EntitlementAuthority>,
        clock: Arc<dyn Clock>,
        hooks: UpgradeHooks,
    ) -> Self {
        Self {
            subscriptions,
            ledger,
            usage,
            authority,
            clock,
            hooks,
        }
    }

    pub fn subscriptions(&self) -> &SubscriptionStatusService {
        &self.subscriptions
    }

    pub fn ledger(&self) -> &BalanceLedgerService {
        &self.ledger
    }

    pub fn usage(&self) -> &UsageTrackerService {
        &self.usage
    }

    /// 利用可否を判定する。検証できない場合は拒否を返し、エラーは返さない。
    pub async fn check_access(&self, feature: FeatureId) -> GateDecision {
        match self.evaluate(feature).await {
            Ok(decision) => {
                tracing::debug!(
                    feature = %feature,
                    outcome = ?decision.outcome,
                    granted_by = ?decision.granted_by,
                    "access evaluated"
                );
                decision
            }
            Err(e) => {
                tracing::warn!(feature = %feature, error = %e, "access check failed closed");
                GateDecision::fail_closed()
            }
        }
    }

    /// 文字列の機能 ID で判定する。未知の ID は拒否。
    pub async fn check_access_str(&self, feature: &str) -> GateDecision {
        match FeatureId::from_str(feature) {
            Ok(feature) => self.check_access(feature).await,
            Err(e) => {
                tracing::warn!(feature, error = %e, "access check for unknown feature");
                GateDecision::fail_closed()
            }
        }
    }

    async fn evaluate(&self, feature: FeatureId) -> Result<GateDecision, AppError> {
        let status = self.subscriptions.get_status().await;
        if status.is_default() {
            return Err(status
                .error
                .unwrap_or_else(|| AppError::Internal("subscription status unavailable".into())));
        }

        let table = resolve_limits(&status.value);
        let limit = table.limit(feature)?;

        let remaining = match feature.period() {
            Some(_) => Some(self.usage.remaining(feature, limit).await),
            None => None,
        };
        let granted_by_plan = match remaining {
            Some(remaining) => remaining.is_available(),
            None => limit.is_granted(),
        };
        if granted_by_plan {
            return Ok(GateDecision::allowed(limit, remaining, AccessGrant::Plan));
        }

        if let Some(kind) = feature.consumable_escape_hatch() {
            let read = self.ledger.read_balance().await;
            if read.is_default() {
                return Err(read
                    .error
                    .unwrap_or_else(|| AppError::Internal("balance unavailable".into())));
            }
            let balance = read.value.get(kind);
            if balance > 0 {
                return Ok(GateDecision::allowed(
                    limit,
                    remaining,
                    AccessGrant::Consumable { kind, balance },
                ));
            }
        }

        Ok(GateDecision::denied(limit, remaining, denial_reason(feature)))
    }

    /// 判定して、拒否ならアップグレード誘導を表示し、一定時間後に遷移させる
    pub async fn request_access(&self, feature: FeatureId) -> GateDecision {
        let decision = self.check_access(feature).await;
        if decision.can_use {
            return decision;
        }

        let copy = feature.upgrade_copy();
        self.hooks
            .presenter
            .show(feature, copy.description, copy.icon);

        let navigator = Arc::clone(&self.hooks.navigator);
        let delay = self.hooks.navigation_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            navigator.navigate();
        });

        decision
    }

    /// 利用を確定させる。プラン枠なら回数を記録し、アイテム経由なら 1 個消費する。
    ///
    /// 回数の記録は上限を再確認してから書き込む。判定後に別の呼び出しが枠を使い切った
    /// 場合は判定をやり直し、アイテムで代替できなければ拒否する。
    pub async fn use_feature(&self, feature: FeatureId) -> GateDecision {
        let mut decision = self.check_access(feature).await;

        if let (Some(AccessGrant::Plan), Some(limit)) = (decision.granted_by, decision.limit) {
            if feature.period().is_some() {
                match self.usage.try_record_usage(feature, limit).await {
                    Some(record) => {
                        decision.remaining = Some(limit.remaining_after(record.count));
                    }
                    None => {
                        tracing::debug!(feature = %feature, "quota used up by a concurrent use");
                        decision = self.check_access(feature).await;
                        if decision.is_granted_by_plan() {
                            return GateDecision::denied(
                                limit,
                                Some(Remaining::Count(0)),
                                denial_reason(feature),
                            );
                        }
                    }
                }
            }
        }

        match decision.granted_by {
            Some(AccessGrant::Plan) => {}
            Some(AccessGrant::Consumable { kind, balance }) => {
                if !self.ledger.consume(kind, 1).await {
                    let limit = decision.limit.unwrap_or(Limit::Disabled);
                    let reason = denial_reason(feature);
                    return GateDecision::denied(limit, decision.remaining, reason);
                }
                decision.granted_by = Some(AccessGrant::Consumable {
                    kind,
                    balance: balance.saturating_sub(1),
                });
            }
            None => return decision,
        }

        self.track_usage(feature).await;
        decision
    }

    /// 利用状況の送信（失敗しても判定には影響しない）
    pub async fn track_usage(&self, feature: FeatureId) {
        if let Err(e) = self.authority.track_usage(feature, self.clock.now()).await {
            tracing::warn!(feature = %feature, error = %e, "failed to track usage");
        }
    }

    pub async fn current_limits(&self) -> FeatureLimitTable {
        resolve_limits(&self.subscriptions.get_status().await.value)
    }

    pub async fn overview(&self) -> EntitlementOverview {
        let status = self.subscriptions.get_status().await;
        let balance = self.ledger.read_balance().await;
        let table = resolve_limits(&status.value);

        let mut features = Vec::with_capacity(table.limits.len());
        for entry in table.iter() {
            let used = match entry.feature_id.period() {
                Some(_) => Some(self.usage.used(entry.feature_id).await),
                None => None,
            };
            features.push(FeatureUsage {
                feature_id: entry.feature_id,
                limit: entry.limit,
                is_boolean_feature: entry.is_boolean_feature,
                used,
                remaining: used.map(|used| entry.limit.remaining_after(used)),
            });
        }

        let degraded = status.is_fallback() || balance.is_fallback();
        EntitlementOverview {
            plan: status.value.effective_plan(),
            is_active: status.value.is_active,
            is_cancelled: status.value.is_cancelled(),
            days_until_renewal: status.value.days_until_renewal(self.clock.now()),
            balance: balance.value,
            features,
            degraded,
        }
    }

    /// キャッシュと利用回数をすべて破棄する
    pub async fn logout(&self) {
        self.subscriptions.clear().await;
        self.ledger.clear().await;
        self.usage.clear().await;
        tracing::info!("entitlement state cleared");
    }
}

fn denial_reason(feature: FeatureId) -> String {
    match feature.period() {
        Some(period) => format!("no {} remaining {}", feature.label(), period.label()),
        None => format!("{} requires an upgraded plan", feature.label()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{CheckoutFlow, CheckoutOutcome};
    use crate::domain::entities::{DecisionOutcome, SubscriptionRecord, UNVERIFIABLE_REASON};
    use crate::domain::value_objects::{ConsumableKind, ProductId};
    use crate::infrastructure::clock::SystemClock;
    use crate::infrastructure::storage::MemoryKeyValueStore;
    use crate::shared::config::CacheConfig;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use mockall::mock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    mock! {
        pub Authority {}

        #[async_trait]
        impl EntitlementAuthority for Authority {
            async fn fetch_subscription(&self) -> Result<SubscriptionRecord, AppError>;
            async fn fetch_balance(&self) -> Result<ConsumableBalance, AppError>;
            async fn report_consumption(&self, kind: ConsumableKind, quantity: u32) -> Result<(), AppError>;
            async fn cancel_subscription(&self) -> Result<(), AppError>;
            async fn track_usage(&self, feature: FeatureId, at: DateTime<Utc>) -> Result<(), AppError>;
        }
    }

    mock! {
        pub Checkout {}

        #[async_trait]
        impl CheckoutFlow for Checkout {
            async fn initiate(&self, product_id: &ProductId) -> Result<CheckoutOutcome, AppError>;
        }
    }

    #[derive(Default)]
    struct CountingPresenter {
        shown: AtomicUsize,
    }

    impl UpgradePromptPresenter for CountingPresenter {
        fn show(&self, _feature: FeatureId, _description: &str, _icon: &str) {
            self.shown.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct CountingNavigator {
        navigated: AtomicUsize,
    }

    impl UpgradeNavigator for CountingNavigator {
        fn navigate(&self) {
            self.navigated.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Harness {
        gate: FeatureGateService,
        presenter: Arc<CountingPresenter>,
        navigator: Arc<CountingNavigator>,
    }

    fn harness(authority: MockAuthority) -> Harness {
        let authority: Arc<dyn EntitlementAuthority> = Arc::new(authority);
        let store = Arc::new(MemoryKeyValueStore::new());
        let clock = Arc::new(SystemClock);
        let config = CacheConfig::default();
        let presenter = Arc::new(CountingPresenter::default());
        let navigator = Arc::new(CountingNavigator::default());

        let subscriptions = Arc::new(SubscriptionStatusService::new(
            Arc::clone(&authority),
            store.clone(),
            clock.clone(),
            &config,
        ));
        let ledger = BalanceLedgerService::new(
            Arc::clone(&authority),
            Arc::new(MockCheckout::new()),
            store.clone(),
            clock.clone(),
            &config,
        );
        let usage = Arc::new(UsageTrackerService::new(store, clock.clone()));
        let gate = FeatureGateService::new(
            subscriptions,
            ledger,
            usage,
            authority,
            clock,
            UpgradeHooks {
                presenter: presenter.clone(),
                navigator: navigator.clone(),
                navigation_delay: Duration::from_millis(5),
            },
        );

        Harness {
            gate,
            presenter,
            navigator,
        }
    }

    fn authority_with(plan: PlanTier, balance: ConsumableBalance) -> MockAuthority {
        let mut authority = MockAuthority::new();
        authority
            .expect_fetch_subscription()
            .returning(move || Ok(SubscriptionRecord::active(plan)));
        authority
            .expect_fetch_balance()
            .returning(move || Ok(balance.clone()));
        authority
    }

    #[tokio::test]
    async fn test_plan_grant_wins_over_consumable() {
        let mut authority = MockAuthority::new();
        authority
            .expect_fetch_subscription()
            .returning(|| Ok(SubscriptionRecord::active(PlanTier::Ultimate)));
        authority.expect_fetch_balance().never();

        let h = harness(authority);
        let decision = h.gate.check_access(FeatureId::SuperLikesPerDay).await;

        assert!(decision.can_use);
        assert!(decision.is_granted_by_plan());
        assert_eq!(decision.remaining, Some(Remaining::Unlimited));
    }

    #[tokio::test]
    async fn test_boolean_feature_denied_on_free_plan() {
        let h = harness(authority_with(PlanTier::Free, ConsumableBalance::new()));
        let decision = h.gate.check_access(FeatureId::CanSeeWhoLiked).await;

        assert!(!decision.can_use);
        assert!(decision.upgrade_required);
        assert_eq!(
            decision.reason.as_deref(),
            Some("see who liked you requires an upgraded plan")
        );
        assert_eq!(decision.remaining, None);
    }

    #[tokio::test]
    async fn test_boolean_feature_unlocked_by_filter_pass() {
        let h = harness(authority_with(
            PlanTier::Free,
            ConsumableBalance::new().with(ConsumableKind::FilterPass, 1),
        ));
        let decision = h.gate.check_access(FeatureId::AdvancedFilters).await;

        assert!(decision.can_use);
        assert!(!decision.upgrade_required);
        assert_eq!(
            decision.granted_by,
            Some(AccessGrant::Consumable {
                kind: ConsumableKind::FilterPass,
                balance: 1
            })
        );
    }

    #[tokio::test]
    async fn test_unknown_feature_string_fails_closed() {
        let h = harness(MockAuthority::new());
        let decision = h.gate.check_access_str("teleport").await;

        assert_eq!(decision.outcome, DecisionOutcome::ErrorDefaultDenied);
        assert_eq!(decision.reason.as_deref(), Some(UNVERIFIABLE_REASON));
    }

    #[tokio::test]
    async fn test_use_feature_records_quota_usage() {
        let mut authority = authority_with(PlanTier::Free, ConsumableBalance::new());
        authority.expect_track_usage().times(1).returning(|_, _| Ok(()));

        let h = harness(authority);
        let decision = h.gate.use_feature(FeatureId::SwipesPerDay).await;

        assert!(decision.can_use);
        assert_eq!(decision.remaining, Some(Remaining::Count(49)));
        assert_eq!(h.gate.usage().used(FeatureId::SwipesPerDay).await, 1);
    }

    #[tokio::test]
    async fn test_track_usage_failure_is_swallowed() {
        let mut authority = authority_with(PlanTier::Premium, ConsumableBalance::new());
        authority
            .expect_track_usage()
            .returning(|_, _| Err(AppError::Network("analytics down".into())));

        let h = harness(authority);
        let decision = h.gate.use_feature(FeatureId::LikesPerDay).await;

        assert!(decision.can_use);
        assert_eq!(decision.remaining, Some(Remaining::Unlimited));
    }

    #[tokio::test]
    async fn test_request_access_prompts_then_navigates() {
        let h = harness(authority_with(PlanTier::Free, ConsumableBalance::new()));
        let decision = h.gate.request_access(FeatureId::PriorityMatching).await;

        assert!(!decision.can_use);
        assert_eq!(h.presenter.shown.load(Ordering::SeqCst), 1);
        assert_eq!(h.navigator.navigated.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(h.navigator.navigated.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_request_access_allowed_has_no_side_effects() {
        let h = harness(authority_with(PlanTier::Premium, ConsumableBalance::new()));
        let decision = h.gate.request_access(FeatureId::CanUndoSwipes).await;

        assert!(decision.can_use);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(h.presenter.shown.load(Ordering::SeqCst), 0);
        assert_eq!(h.navigator.navigated.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_denial_reason_for_quota_mentions_period() {
        assert_eq!(
            denial_reason(FeatureId::BoostsPerMonth),
            "no boosts remaining this month"
        );
    }
}
