use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// 永続化されるキャッシュスロットの中身
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedEntry<T> {
    pub value: T,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub fetched_at: DateTime<Utc>,
}

impl<T> CachedEntry<T> {
    pub fn new(value: T, fetched_at: DateTime<Utc>) -> Self {
        Self { value, fetched_at }
    }

    /// `0 <= now - fetched_at < ttl` のときのみ有効
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let age = now - self.fetched_at;
        age >= Duration::zero() && age < ttl
    }

    /// 値は残したまま必ず期限切れになるよう `fetched_at` を巻き戻す
    pub fn expire(&mut self) {
        self.fetched_at = DateTime::<Utc>::UNIX_EPOCH;
    }
}
