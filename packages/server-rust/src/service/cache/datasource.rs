//! Dual-keyspace datasource cache.
//!
//! A datasource can be looked up by numeric id or by uid. Both keyspaces live
//! in one [`TtlCache`] and every successful fetch seeds the other keyspace, so
//! a lookup by uid makes the following lookup by id a hit (and vice versa,
//! when the record has a uid). All keys are scoped to the caller's routing
//! path and session token.

use std::sync::Arc;

use opstore_core::{Datasource, RequestContext};
use tracing::debug;

use super::{record_lookup, CacheConfig};
use crate::opstorage::GetDatasourceQuery;
use crate::service::{DatasourceError, DatasourceSource};
use crate::storage::{NamedCache, Purgeable, ScopedKey, TtlCache};

const ENTITY: &str = "datasource";

/// Lookup value within one identity scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DatasourceLookup {
    Id(i64),
    Uid(String),
}

type Key = ScopedKey<DatasourceLookup>;

/// TTL cache in front of a [`DatasourceSource`].
///
/// No single-flight: concurrent misses for one key each fetch, and the last
/// write wins.
pub struct DatasourceCache {
    source: Arc<dyn DatasourceSource>,
    entries: Arc<TtlCache<Key, Arc<Datasource>>>,
    config: CacheConfig,
}

impl DatasourceCache {
    #[must_use]
    pub fn new(source: Arc<dyn DatasourceSource>, config: CacheConfig) -> Self {
        Self {
            source,
            entries: Arc::new(TtlCache::new()),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> CacheConfig {
        self.config
    }

    /// Number of stored entries across both keyspaces, including expired
    /// entries not yet reclaimed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Handle for the background sweeper.
    #[must_use]
    pub fn purgeable(&self) -> Arc<dyn Purgeable> {
        Arc::new(NamedCache::new(ENTITY, Arc::clone(&self.entries)))
    }

    /// Returns the datasource with `id`, fetching on a miss.
    ///
    /// A fetched record is cached under its id for `primary_ttl` and, when its
    /// uid is non-empty, under its uid for `secondary_ttl`. `skip_cache`
    /// bypasses the read but still refreshes the entries.
    ///
    /// # Errors
    ///
    /// - `EmptySession` if `ctx` has no session token (nothing is read or fetched)
    /// - any error from the source; nothing is cached on failure
    pub async fn get_datasource(
        &self,
        ctx: &RequestContext,
        id: i64,
        org_id: i64,
        skip_cache: bool,
    ) -> Result<Arc<Datasource>, DatasourceError> {
        if !ctx.has_session() {
            return Err(DatasourceError::EmptySession);
        }

        let key = ScopedKey::new(ctx, DatasourceLookup::Id(id));
        if let Some(cached) = self.lookup(&key, "id", skip_cache) {
            return Ok(cached);
        }

        debug!(id, org_id, "querying for data source via store");
        let datasource = Arc::new(
            self.source
                .get_datasource(ctx, &GetDatasourceQuery::by_id(id, org_id))
                .await?,
        );

        if !datasource.uid.is_empty() {
            self.entries.set(
                key.rescope(DatasourceLookup::Uid(datasource.uid.clone())),
                Arc::clone(&datasource),
                self.config.secondary_ttl,
            );
        }
        self.entries
            .set(key, Arc::clone(&datasource), self.config.primary_ttl);
        Ok(datasource)
    }

    /// Returns the datasource with `uid`, fetching on a miss.
    ///
    /// A fetched record is cached under both its uid and its id for
    /// `primary_ttl`.
    ///
    /// # Errors
    ///
    /// - `EmptyUid` / `MissingOrgId` for an unusable lookup
    /// - `EmptySession` if `ctx` has no session token
    /// - any error from the source; nothing is cached on failure
    pub async fn get_datasource_by_uid(
        &self,
        ctx: &RequestContext,
        uid: &str,
        org_id: i64,
        skip_cache: bool,
    ) -> Result<Arc<Datasource>, DatasourceError> {
        if uid.is_empty() {
            return Err(DatasourceError::EmptyUid);
        }
        if org_id == 0 {
            return Err(DatasourceError::MissingOrgId);
        }
        if !ctx.has_session() {
            return Err(DatasourceError::EmptySession);
        }

        let key = ScopedKey::new(ctx, DatasourceLookup::Uid(uid.to_string()));
        if let Some(cached) = self.lookup(&key, "uid", skip_cache) {
            return Ok(cached);
        }

        debug!(uid, org_id, "querying for data source via store");
        let datasource = Arc::new(
            self.source
                .get_datasource(ctx, &GetDatasourceQuery::by_uid(uid, org_id))
                .await?,
        );

        self.entries.set(
            key.rescope(DatasourceLookup::Id(datasource.id)),
            Arc::clone(&datasource),
            self.config.primary_ttl,
        );
        self.entries
            .set(key, Arc::clone(&datasource), self.config.primary_ttl);
        Ok(datasource)
    }

    fn lookup(&self, key: &Key, keyspace: &'static str, skip_cache: bool) -> Option<Arc<Datasource>> {
        if skip_cache {
            record_lookup(ENTITY, keyspace, "skip");
            return None;
        }
        debug!(keyspace, lookup = ?key.lookup(), "querying for data source via cache");
        let cached = self.entries.get(key);
        record_lookup(ENTITY, keyspace, if cached.is_some() { "hit" } else { "miss" });
        cached
    }
}

impl std::fmt::Debug for DatasourceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasourceCache")
            .field("entries", &self.entries.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
