pub mod cache;
pub mod clock;
pub mod database;
pub mod remote;
pub mod storage;
pub mod upgrade_prompt;

pub use cache::{CacheRead, ReadSource, SingleFlightCache};
pub use clock::{ManualClock, SystemClock};
pub use database::ConnectionPool;
pub use remote::HttpEntitlementAuthority;
pub use storage::{MemoryKeyValueStore, SqliteKeyValueStore};
pub use upgrade_prompt::LoggingUpgradePrompt;
