use crate::application::ports::{CheckoutFlow, Clock, EntitlementAuthority, KeyValueStore};
use crate::domain::entities::ConsumableBalance;
use crate::domain::value_objects::{ConsumableKind, ProductId};
use crate::infrastructure::cache::{CacheRead, Fetcher, SingleFlightCache};
use crate::shared::config::CacheConfig;
use crate::shared::error::AppError;
use futures::FutureExt;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const BALANCE_SLOT: &str = "balance";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

impl PurchaseOutcome {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            transaction_id: None,
        }
    }
}

/// 権威値に上乗せする仮の増減
///
/// `barrier` は権威側への反映が済んだ時点のフェッチ通番。これより後に開始した
/// フェッチの結果が届いた時点で破棄される。`None` の間は反映待ち。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingDelta {
    id: u64,
    kind: ConsumableKind,
    amount: i64,
    barrier: Option<u64>,
}

#[derive(Debug, Default)]
struct Ledger {
    pending: Vec<PendingDelta>,
    next_id: u64,
}

impl Ledger {
    fn push(&mut self, kind: ConsumableKind, amount: i64, barrier: Option<u64>) -> u64 {
        self.next_id += 1;
        self.pending.push(PendingDelta {
            id: self.next_id,
            kind,
            amount,
            barrier,
        });
        self.next_id
    }

    fn seal(&mut self, id: u64, barrier: u64) {
        if let Some(delta) = self.pending.iter_mut().find(|delta| delta.id == id) {
            delta.barrier = Some(barrier);
        }
    }

    /// `generation` のフェッチ結果に含まれている増減を取り除く
    fn settle(&mut self, generation: u64) {
        self.pending
            .retain(|delta| !matches!(delta.barrier, Some(barrier) if generation > barrier));
    }

    fn apply(&self, mut balance: ConsumableBalance) -> ConsumableBalance {
        for delta in &self.pending {
            balance.apply_delta(delta.kind, delta.amount);
        }
        balance
    }
}

/// 消費型アイテム残高の台帳
///
/// 表示される残高は「権威値 + 反映待ちの仮増減」。権威値の新しいフェッチが届くと
/// 仮増減は合算されずに丸ごと置き換えられる。
#[derive(Clone)]
pub struct BalanceLedgerService {
    authority: Arc<dyn EntitlementAuthority>,
    checkout: Arc<dyn CheckoutFlow>,
    cache: SingleFlightCache<ConsumableBalance>,
    ledger: Arc<Mutex<Ledger>>,
}

impl BalanceLedgerService {
    pub fn new(
        authority: Arc<dyn EntitlementAuthority>,
        checkout: Arc<dyn CheckoutFlow>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        config: &CacheConfig,
    ) -> Self {
        let fetch_authority = Arc::clone(&authority);
        let fetcher: Fetcher<ConsumableBalance> = Arc::new(move || {
            let authority = Arc::clone(&fetch_authority);
            async move { authority.fetch_balance().await }.boxed()
        });

        let cache = SingleFlightCache::new(
            BALANCE_SLOT,
            config.balance_ttl(),
            config.fetch_timeout(),
            store,
            clock,
            ConsumableBalance::new(),
            fetcher,
        );

        Self {
            authority,
            checkout,
            cache,
            ledger: Arc::new(Mutex::new(Ledger::default())),
        }
    }

    /// 仮増減を反映した残高と読み出し元
    pub async fn read_balance(&self) -> CacheRead<ConsumableBalance> {
        let mut read = self.cache.get().await;
        let mut ledger = self.ledger.lock().await;
        ledger.settle(read.generation);
        read.value = ledger.apply(read.value);
        read
    }

    pub async fn get_balance(&self) -> ConsumableBalance {
        self.read_balance().await.value
    }

    pub async fn balance_of(&self, kind: ConsumableKind) -> u32 {
        self.get_balance().await.get(kind)
    }

    pub async fn has_enough_balance(&self, kind: ConsumableKind, quantity: u32) -> bool {
        self.balance_of(kind).await >= quantity
    }

    pub async fn purchase(&self, product_id: &ProductId) -> PurchaseOutcome {
        let Some(grant) = product_id.grant() else {
            tracing::warn!(product_id = %product_id, "unknown product");
            return PurchaseOutcome::failed(
                AppError::UnknownProduct(product_id.to_string()).to_string(),
            );
        };

        let outcome = match self.checkout.initiate(product_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(product_id = %product_id, error = %e, "checkout failed");
                return PurchaseOutcome::failed(e.to_string());
            }
        };

        if !outcome.success {
            return PurchaseOutcome {
                success: false,
                message: outcome
                    .message
                    .or_else(|| Some("Purchase was not completed".to_string())),
                transaction_id: outcome.transaction_id,
            };
        }

        {
            let mut ledger = self.ledger.lock().await;
            ledger.push(
                grant.kind,
                i64::from(grant.quantity),
                Some(self.cache.fetches_started()),
            );
        }
        tracing::info!(
            product_id = %product_id,
            kind = %grant.kind,
            quantity = grant.quantity,
            "purchase completed"
        );

        self.cache.invalidate().await;
        self.spawn_refresh();

        PurchaseOutcome {
            success: true,
            message: outcome.message.or_else(|| {
                Some(format!("Added {} {}", grant.quantity, grant.kind.label()))
            }),
            transaction_id: outcome.transaction_id,
        }
    }

    /// 残高が足りれば仮に差し引いて `true`。足りなければ何も変更せず `false`。
    pub async fn consume(&self, kind: ConsumableKind, quantity: u32) -> bool {
        if quantity == 0 {
            return true;
        }

        let read = self.cache.get().await;
        let id = {
            let mut ledger = self.ledger.lock().await;
            ledger.settle(read.generation);
            let available = ledger.apply(read.value).get(kind);
            if available < quantity {
                tracing::debug!(kind = %kind, available, quantity, "insufficient balance");
                return false;
            }
            ledger.push(kind, -i64::from(quantity), None)
        };

        let ledger = self.clone();
        tokio::spawn(async move {
            ledger.reconcile_consumption(id, kind, quantity).await;
        });
        true
    }

    async fn reconcile_consumption(&self, id: u64, kind: ConsumableKind, quantity: u32) {
        if let Err(e) = self.authority.report_consumption(kind, quantity).await {
            tracing::warn!(kind = %kind, quantity, error = %e, "failed to report consumption");
        }
        {
            let mut ledger = self.ledger.lock().await;
            ledger.seal(id, self.cache.fetches_started());
        }
        self.cache.invalidate().await;
        self.read_balance().await;
    }

    /// 権威値を取り直し、反映済みの仮増減を破棄する
    pub async fn reconcile(&self) -> ConsumableBalance {
        self.cache.invalidate().await;
        self.get_balance().await
    }

    pub async fn pending_deltas(&self) -> usize {
        self.ledger.lock().await.pending.len()
    }

    pub async fn invalidate(&self) {
        self.cache.invalidate().await;
    }

    pub async fn clear(&self) {
        self.ledger.lock().await.pending.clear();
        self.cache.clear().await;
    }

    pub async fn last_error(&self) -> Option<AppError> {
        self.cache.last_error().await
    }

    fn spawn_refresh(&self) {
        let ledger = self.clone();
        tokio::spawn(async move {
            ledger.read_balance().await;
        });
    }
}
