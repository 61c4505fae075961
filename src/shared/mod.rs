pub mod config;
pub mod error;

pub use config::{AppConfig, AuthorityConfig, CacheConfig, GateConfig, StorageConfig};
pub use error::{AppError, Result};
