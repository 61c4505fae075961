use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub authority: AuthorityConfig,
    pub cache: CacheConfig,
    pub storage: StorageConfig,
    pub gate: GateConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorityConfig {
    pub base_url: String,
    #[serde(default)]
    pub auth_token: Option<String>,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub subscription_ttl_secs: u64,
    pub balance_ttl_secs: u64,
    pub fetch_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// `None` の場合はプロセス内メモリに保持する
    #[serde(default)]
    pub database_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    pub upgrade_navigation_delay_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            authority: AuthorityConfig {
                base_url: "http://localhost:5001/api".to_string(),
                auth_token: None,
                request_timeout_ms: 10_000,
            },
            cache: CacheConfig::default(),
            storage: StorageConfig::default(),
            gate: GateConfig::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            subscription_ttl_secs: 300, // 5 minutes
            balance_ttl_secs: 60,
            fetch_timeout_ms: 8_000,
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            upgrade_navigation_delay_ms: 1_500,
        }
    }
}

impl CacheConfig {
    pub fn subscription_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.subscription_ttl_secs as i64)
    }

    pub fn balance_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.balance_ttl_secs as i64)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

impl GateConfig {
    pub fn upgrade_navigation_delay(&self) -> Duration {
        Duration::from_millis(self.upgrade_navigation_delay_ms)
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        // 既定値
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("PAWFECT_API_BASE_URL") {
            let trimmed = v.trim().trim_end_matches('/').to_string();
            if !trimmed.is_empty() {
                cfg.authority.base_url = trimmed;
            }
        }
        if let Ok(v) = std::env::var("PAWFECT_API_TOKEN") {
            let token = v.trim().to_string();
            cfg.authority.auth_token = if token.is_empty() { None } else { Some(token) };
        }
        if let Some(value) = env_u64("PAWFECT_API_TIMEOUT_MS") {
            cfg.authority.request_timeout_ms = value;
        }

        // キャッシュ TTL
        if let Some(value) = env_u64("PAWFECT_SUBSCRIPTION_TTL_SECS") {
            cfg.cache.subscription_ttl_secs = value.max(1);
        }
        if let Some(value) = env_u64("PAWFECT_BALANCE_TTL_SECS") {
            cfg.cache.balance_ttl_secs = value.max(1);
        }
        if let Some(value) = env_u64("PAWFECT_FETCH_TIMEOUT_MS") {
            cfg.cache.fetch_timeout_ms = value;
        }

        if let Ok(v) = std::env::var("PAWFECT_DATABASE_URL") {
            let url = v.trim().to_string();
            cfg.storage.database_url = if url.is_empty() { None } else { Some(url) };
        }

        if let Some(value) = env_u64("PAWFECT_UPGRADE_NAVIGATION_DELAY_MS") {
            cfg.gate.upgrade_navigation_delay_ms = value;
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        let base_url = self.authority.base_url.as_str();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err("Authority base_url scheme must be http or https".to_string());
        }
        if self.authority.request_timeout_ms == 0 {
            return Err("Authority request_timeout_ms must be greater than 0".to_string());
        }
        if self.cache.subscription_ttl_secs == 0 {
            return Err("Cache subscription_ttl_secs must be greater than 0".to_string());
        }
        if self.cache.balance_ttl_secs == 0 {
            return Err("Cache balance_ttl_secs must be greater than 0".to_string());
        }
        if self.cache.balance_ttl_secs > self.cache.subscription_ttl_secs {
            return Err(
                "Cache balance_ttl_secs must not exceed subscription_ttl_secs".to_string(),
            );
        }
        if self.cache.fetch_timeout_ms == 0 {
            return Err("Cache fetch_timeout_ms must be greater than 0".to_string());
        }
        Ok(())
    }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| parse_u64(&v))
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}
