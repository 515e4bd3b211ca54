//! In-memory caching primitives for the proxy.
//!
//! - [`TtlCache`]: concurrent key-value map with per-entry TTL and lazy expiry
//! - [`ScopedKey`]: cache key namespaced by the caller's routing path and
//!   session token
//! - [`CacheSweeper`]: background task reclaiming expired entries

pub mod key;
pub mod sweeper;
pub mod ttl_cache;

pub use key::ScopedKey;
pub use sweeper::{CacheSweeper, NamedCache, Purgeable};
pub use ttl_cache::{CacheEntry, TtlCache};
