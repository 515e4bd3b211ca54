//! Tenant-scoped lookup caches.

pub mod datasource;

use std::time::Duration;

pub use datasource::{DatasourceCache, DatasourceLookup};

/// Default lifetime of a cached lookup.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5);

/// Entry lifetimes for a dual-keyspace cache.
///
/// `primary_ttl` applies to the keyspace that was queried and to every entry
/// written by a uid lookup. `secondary_ttl` applies only to the uid entry
/// seeded as a side effect of an id lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub primary_ttl: Duration,
    pub secondary_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            primary_ttl: DEFAULT_CACHE_TTL,
            secondary_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

/// Records one cache lookup outcome.
pub(crate) fn record_lookup(entity: &'static str, keyspace: &'static str, outcome: &'static str) {
    metrics::counter!(
        "opstore_cache_lookups_total",
        "entity" => entity,
        "keyspace" => keyspace,
        "outcome" => outcome
    )
    .increment(1);
}
