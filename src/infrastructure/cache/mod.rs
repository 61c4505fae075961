pub mod single_flight_cache;

pub use single_flight_cache::{CacheRead, Fetcher, ReadSource, SingleFlightCache};
