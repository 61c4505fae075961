#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use pawfect_gate::application::ports::{
    CheckoutFlow, CheckoutOutcome, EntitlementAuthority, KeyValueStore, UpgradeNavigator,
    UpgradePromptPresenter,
};
use pawfect_gate::domain::entities::{ConsumableBalance, SubscriptionRecord};
use pawfect_gate::domain::value_objects::{ConsumableKind, FeatureId, ProductId};
use pawfect_gate::infrastructure::{ManualClock, MemoryKeyValueStore};
use pawfect_gate::{AppConfig, AppError, AppState, UpgradeHooks};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// 呼び出し回数を数えるインメモリの権威実装
///
/// 応答内容は呼び出し時点で確定し、遅延はその後に入る。
/// 購入・消費は実際のバックエンドと同じく残高へ反映する。
#[derive(Default)]
pub struct FakeAuthority {
    subscription: Mutex<Option<SubscriptionRecord>>,
    balance: Mutex<ConsumableBalance>,
    pub subscription_calls: AtomicUsize,
    pub balance_calls: AtomicUsize,
    pub consumption_reports: AtomicUsize,
    pub tracked: AtomicUsize,
    fail_tracking: Mutex<bool>,
    fail_balance: Mutex<bool>,
    delay: Mutex<Duration>,
}

impl FakeAuthority {
    pub fn with_subscription(record: SubscriptionRecord) -> Self {
        let authority = Self::default();
        authority.set_subscription(Some(record));
        authority
    }

    /// `None` は取得失敗を意味する
    pub fn set_subscription(&self, record: Option<SubscriptionRecord>) {
        *self.subscription.lock().unwrap() = record;
    }

    pub fn set_balance(&self, balance: ConsumableBalance) {
        *self.balance.lock().unwrap() = balance;
    }

    pub fn server_balance(&self, kind: ConsumableKind) -> u32 {
        self.balance.lock().unwrap().get(kind)
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// `true` の間は残高取得が失敗する
    pub fn set_balance_failing(&self, failing: bool) {
        *self.fail_balance.lock().unwrap() = failing;
    }

    pub fn fail_tracking(&self) {
        *self.fail_tracking.lock().unwrap() = true;
    }

    fn delay(&self) -> Duration {
        *self.delay.lock().unwrap()
    }
}

#[async_trait]
impl EntitlementAuthority for FakeAuthority {
    async fn fetch_subscription(&self) -> Result<SubscriptionRecord, AppError> {
        self.subscription_calls.fetch_add(1, Ordering::SeqCst);
        let snapshot = self.subscription.lock().unwrap().clone();
        tokio::time::sleep(self.delay()).await;
        snapshot.ok_or_else(|| AppError::Network("connection refused".into()))
    }

    async fn fetch_balance(&self) -> Result<ConsumableBalance, AppError> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        let snapshot = if *self.fail_balance.lock().unwrap() {
            Err(AppError::Network("balance service unavailable".into()))
        } else {
            Ok(self.balance.lock().unwrap().clone())
        };
        tokio::time::sleep(self.delay()).await;
        snapshot
    }

    async fn report_consumption(
        &self,
        kind: ConsumableKind,
        quantity: u32,
    ) -> Result<(), AppError> {
        self.consumption_reports.fetch_add(1, Ordering::SeqCst);
        self.balance
            .lock()
            .unwrap()
            .apply_delta(kind, -i64::from(quantity));
        Ok(())
    }

    async fn cancel_subscription(&self) -> Result<(), AppError> {
        let mut subscription = self.subscription.lock().unwrap();
        if let Some(record) = subscription.as_mut() {
            record.auto_renew = false;
        }
        Ok(())
    }

    async fn track_usage(&self, _feature: FeatureId, _at: DateTime<Utc>) -> Result<(), AppError> {
        self.tracked.fetch_add(1, Ordering::SeqCst);
        if *self.fail_tracking.lock().unwrap() {
            return Err(AppError::Network("analytics unavailable".into()));
        }
        Ok(())
    }
}

/// 購入を権威側の残高へ反映するチェックアウト
pub struct FakeCheckout {
    authority: Arc<FakeAuthority>,
    pub attempts: AtomicUsize,
    decline: Mutex<bool>,
}

impl FakeCheckout {
    pub fn new(authority: Arc<FakeAuthority>) -> Self {
        Self {
            authority,
            attempts: AtomicUsize::new(0),
            decline: Mutex::new(false),
        }
    }

    pub fn decline(&self) {
        *self.decline.lock().unwrap() = true;
    }
}

#[async_trait]
impl CheckoutFlow for FakeCheckout {
    async fn initiate(&self, product_id: &ProductId) -> Result<CheckoutOutcome, AppError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if *self.decline.lock().unwrap() {
            return Ok(CheckoutOutcome::rejected("payment declined"));
        }
        let grant = product_id
            .grant()
            .ok_or_else(|| AppError::UnknownProduct(product_id.to_string()))?;
        self.authority
            .balance
            .lock()
            .unwrap()
            .apply_delta(grant.kind, i64::from(grant.quantity));
        Ok(CheckoutOutcome::completed(format!("txn-{attempt}")))
    }
}

#[derive(Default)]
pub struct RecordingPrompt {
    pub shown: Mutex<Vec<(FeatureId, String, String)>>,
    pub navigations: AtomicUsize,
}

impl UpgradePromptPresenter for RecordingPrompt {
    fn show(&self, feature: FeatureId, description: &str, icon: &str) {
        self.shown
            .lock()
            .unwrap()
            .push((feature, description.to_string(), icon.to_string()));
    }
}

impl UpgradeNavigator for RecordingPrompt {
    fn navigate(&self) {
        self.navigations.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct TestEnv {
    pub state: AppState,
    pub authority: Arc<FakeAuthority>,
    pub checkout: Arc<FakeCheckout>,
    pub store: Arc<MemoryKeyValueStore>,
    pub clock: Arc<ManualClock>,
    pub prompt: Arc<RecordingPrompt>,
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 10, 0, 0).unwrap()
}

pub fn build_env(authority: FakeAuthority) -> TestEnv {
    build_env_with_store(authority, Arc::new(MemoryKeyValueStore::new()))
}

pub fn build_env_with_store(
    authority: FakeAuthority,
    store: Arc<MemoryKeyValueStore>,
) -> TestEnv {
    assemble(authority, store.clone(), store)
}

/// 読み書きのたびに他タスクへ制御を譲るストアで組み立てる
pub fn build_env_yielding(authority: FakeAuthority) -> TestEnv {
    let store = Arc::new(MemoryKeyValueStore::new());
    let backend = Arc::new(YieldingStore {
        inner: store.clone(),
    });
    assemble(authority, store, backend)
}

fn assemble(
    authority: FakeAuthority,
    store: Arc<MemoryKeyValueStore>,
    backend: Arc<dyn KeyValueStore>,
) -> TestEnv {
    let authority = Arc::new(authority);
    let checkout = Arc::new(FakeCheckout::new(Arc::clone(&authority)));
    let clock = Arc::new(ManualClock::new(start_time()));
    let prompt = Arc::new(RecordingPrompt::default());

    let hooks = UpgradeHooks {
        presenter: prompt.clone(),
        navigator: prompt.clone(),
        navigation_delay: Duration::from_millis(10),
    };
    let state = AppState::with_components(
        AppConfig::default(),
        authority.clone(),
        checkout.clone(),
        backend,
        clock.clone(),
        hooks,
    );

    TestEnv {
        state,
        authority,
        checkout,
        store,
        clock,
        prompt,
    }
}

/// 各操作の前後で `yield_now` を挟むストア。await をまたぐ競合を再現する。
pub struct YieldingStore {
    inner: Arc<MemoryKeyValueStore>,
}

#[async_trait]
impl KeyValueStore for YieldingStore {
    async fn get(&self, slot: &str) -> Result<Option<String>, AppError> {
        tokio::task::yield_now().await;
        let value = self.inner.get(slot).await;
        tokio::task::yield_now().await;
        value
    }

    async fn set(&self, slot: &str, value: &str) -> Result<(), AppError> {
        tokio::task::yield_now().await;
        self.inner.set(slot, value).await
    }

    async fn remove(&self, slot: &str) -> Result<(), AppError> {
        tokio::task::yield_now().await;
        self.inner.remove(slot).await
    }

    async fn list_slots(&self, prefix: &str) -> Result<Vec<String>, AppError> {
        tokio::task::yield_now().await;
        self.inner.list_slots(prefix).await
    }
}

/// バックグラウンドの再取得タスクが走りきるまで待つ
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
}
