use crate::application::ports::{Clock, KeyValueStore};
use crate::domain::entities::CachedEntry;
use crate::shared::error::AppError;
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

pub type Fetcher<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, AppError>> + Send + Sync>;

type SharedFetch<T> = Shared<BoxFuture<'static, Result<CachedEntry<T>, AppError>>>;

/// 読み出し結果の出どころ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadSource {
    /// TTL 内のキャッシュ
    Cache,
    /// 今回（または合流した）フェッチの結果。`generation` は開始順の通番。
    Network { generation: u64 },
    /// フェッチ失敗時に返した期限切れの値
    Stale,
    /// フェッチ失敗かつ既知の値がない場合の既定値
    Default,
}

#[derive(Debug, Clone)]
pub struct CacheRead<T> {
    pub value: T,
    pub source: ReadSource,
    pub fetched_at: Option<DateTime<Utc>>,
    /// 値を取得したフェッチの通番。永続スロットから復元した値や既定値は 0。
    pub generation: u64,
    pub error: Option<AppError>,
}

impl<T> CacheRead<T> {
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, ReadSource::Stale | ReadSource::Default)
    }

    pub fn is_default(&self) -> bool {
        matches!(self.source, ReadSource::Default)
    }
}

struct SlotState<T> {
    entry: Option<CachedEntry<T>>,
    entry_generation: u64,
    hydrated: bool,
    in_flight: Option<(u64, SharedFetch<T>)>,
    epoch: u64,
    last_error: Option<AppError>,
}

struct Inner<T> {
    slot: String,
    ttl: chrono::Duration,
    fetch_timeout: Duration,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    fetcher: Fetcher<T>,
    fallback: T,
    state: Mutex<SlotState<T>>,
    generation: AtomicU64,
}

/// TTL 付きの単一スロットキャッシュ
///
/// - 期限切れ時の同時呼び出しは 1 本のフェッチに合流する
/// - フェッチは呼び出し元から切り離して実行されるため、待機側が離脱しても中断されない
/// - 失敗時は期限切れの値、それもなければ既定値を返す
/// - 値は `KeyValueStore` の同名スロットへ `{value, fetchedAt}` として永続化する
pub struct SingleFlightCache<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for SingleFlightCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> SingleFlightCache<T>
where
    T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
{
    pub fn new(
        slot: impl Into<String>,
        ttl: chrono::Duration,
        fetch_timeout: Duration,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        fallback: T,
        fetcher: Fetcher<T>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                slot: slot.into(),
                ttl,
                fetch_timeout,
                store,
                clock,
                fetcher,
                fallback,
                state: Mutex::new(SlotState {
                    entry: None,
                    entry_generation: 0,
                    hydrated: false,
                    in_flight: None,
                    epoch: 0,
                    last_error: None,
                }),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn slot(&self) -> &str {
        &self.inner.slot
    }

    /// これまでに開始したフェッチの数（最新フェッチの通番と一致する）
    pub fn fetches_started(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    pub async fn last_error(&self) -> Option<AppError> {
        self.inner.state.lock().await.last_error.clone()
    }

    /// ネットワークに触れずに現在保持している値を覗く
    pub async fn peek(&self) -> Option<CachedEntry<T>> {
        let mut state = self.inner.state.lock().await;
        self.inner.hydrate(&mut state).await;
        state.entry.clone()
    }

    pub async fn get(&self) -> CacheRead<T> {
        let (generation, fetch) = {
            let mut state = self.inner.state.lock().await;
            self.inner.hydrate(&mut state).await;

            let now = self.inner.clock.now();
            if let Some(entry) = state.entry.as_ref() {
                if entry.is_fresh(now, self.inner.ttl) {
                    return CacheRead {
                        value: entry.value.clone(),
                        source: ReadSource::Cache,
                        fetched_at: Some(entry.fetched_at),
                        generation: state.entry_generation,
                        error: None,
                    };
                }
            }

            match state.in_flight.as_ref() {
                Some((generation, fetch)) => (*generation, fetch.clone()),
                None => self.start_fetch(&mut state),
            }
        };

        match fetch.await {
            Ok(entry) => CacheRead {
                value: entry.value,
                source: ReadSource::Network { generation },
                fetched_at: Some(entry.fetched_at),
                generation,
                error: None,
            },
            Err(err) => {
                let state = self.inner.state.lock().await;
                match state.entry.as_ref() {
                    Some(entry) => CacheRead {
                        value: entry.value.clone(),
                        source: ReadSource::Stale,
                        fetched_at: Some(entry.fetched_at),
                        generation: state.entry_generation,
                        error: Some(err),
                    },
                    None => CacheRead {
                        value: self.inner.fallback.clone(),
                        source: ReadSource::Default,
                        fetched_at: None,
                        generation: 0,
                        error: Some(err),
                    },
                }
            }
        }
    }

    /// 値を残したまま期限切れにし、進行中のフェッチとの合流も断つ
    pub async fn invalidate(&self) {
        let mut state = self.inner.state.lock().await;
        self.inner.hydrate(&mut state).await;
        state.epoch += 1;
        state.in_flight = None;

        let expired = state.entry.as_mut().map(|entry| {
            entry.expire();
            entry.clone()
        });
        if let Some(entry) = expired {
            self.inner.persist(&entry).await;
        }
        tracing::debug!(slot = %self.inner.slot, "cache slot invalidated");
    }

    /// 保持値と永続スロットを破棄する（ログアウト時など）
    pub async fn clear(&self) {
        let mut state = self.inner.state.lock().await;
        state.epoch += 1;
        state.in_flight = None;
        state.entry = None;
        state.entry_generation = 0;
        state.hydrated = true;
        state.last_error = None;

        if let Err(e) = self.inner.store.remove(&self.inner.slot).await {
            tracing::warn!(slot = %self.inner.slot, error = %e, "failed to remove cache slot");
        }
    }

    fn start_fetch(&self, state: &mut SlotState<T>) -> (u64, SharedFetch<T>) {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let epoch = state.epoch;
        let inner = Arc::clone(&self.inner);

        tracing::debug!(slot = %inner.slot, generation, "starting fetch");

        let handle = tokio::spawn(async move {
            let result = match tokio::time::timeout(inner.fetch_timeout, (inner.fetcher)()).await
            {
                Ok(result) => result,
                Err(_) => Err(AppError::Timeout(format!(
                    "{} fetch exceeded {}ms",
                    inner.slot,
                    inner.fetch_timeout.as_millis()
                ))),
            };
            inner.complete(epoch, generation, result).await
        });

        let fetch: BoxFuture<'static, Result<CachedEntry<T>, AppError>> = async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => Err(AppError::from(e)),
            }
        }
        .boxed();
        let shared = fetch.shared();

        state.in_flight = Some((generation, shared.clone()));
        (generation, shared)
    }
}

impl<T> Inner<T>
where
    T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
{
    async fn hydrate(&self, state: &mut SlotState<T>) {
        if state.hydrated {
            return;
        }
        state.hydrated = true;

        match self.store.get(&self.slot).await {
            Ok(Some(raw)) => match serde_json::from_str::<CachedEntry<T>>(&raw) {
                Ok(entry) => state.entry = Some(entry),
                Err(e) => {
                    tracing::warn!(slot = %self.slot, error = %e, "discarding corrupt cache slot");
                }
            },
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(slot = %self.slot, error = %e, "failed to read cache slot");
            }
        }
    }

    async fn complete(
        &self,
        epoch: u64,
        generation: u64,
        result: Result<T, AppError>,
    ) -> Result<CachedEntry<T>, AppError> {
        let mut state = self.state.lock().await;
        let current = state.epoch == epoch;
        if current {
            state.in_flight = None;
        }

        match result {
            Ok(value) => {
                let entry = CachedEntry::new(value, self.clock.now());
                if current {
                    state.entry = Some(entry.clone());
                    state.entry_generation = generation;
                    state.last_error = None;
                    self.persist(&entry).await;
                } else {
                    tracing::debug!(slot = %self.slot, "dropping fetch result superseded by invalidation");
                }
                Ok(entry)
            }
            Err(err) => {
                if err.is_remote_failure() {
                    tracing::warn!(slot = %self.slot, error = %err, "fetch failed");
                } else {
                    tracing::error!(slot = %self.slot, error = %err, "fetch failed");
                }
                state.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    async fn persist(&self, entry: &CachedEntry<T>) {
        let raw = match serde_json::to_string(entry) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(slot = %self.slot, error = %e, "failed to encode cache slot");
                return;
            }
        };
        if let Err(e) = self.store.set(&self.slot, &raw).await {
            tracing::warn!(slot = %self.slot, error = %e, "failed to persist cache slot");
        }
    }
}
