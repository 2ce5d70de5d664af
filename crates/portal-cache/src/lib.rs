//! Cache adapters, request coalescing and the existence filter used by the
//! Portal redirect path.

pub mod existence_filter;
pub mod moka;
pub mod redis;
pub mod redis_ha;
pub mod single_flight;

pub use existence_filter::{ExistenceFilter, ExistenceFilterConfig, DEFAULT_IN_FLIGHT_MARGIN};
pub use portal_core::cache::{Result, UrlCache};
pub use portal_core::CacheError;
pub use self::moka::{MokaCacheConfig, MokaUrlCache};
pub use self::redis::RedisUrlCache;
pub use redis_ha::RedisHAUrlCache;
pub use single_flight::{Abandoned, Flight, SingleFlight};

/// Key prefix shared by the Redis cache adapters.
pub const DEFAULT_KEY_PREFIX: &str = "portal:url:";
