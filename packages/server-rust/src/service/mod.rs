//! Entity lookup services.
//!
//! Requests flow through two layers:
//!
//! 1. **Store** (`datasource`): validates lookups, tags the context with the
//!    operation name, calls the storage façade, and normalizes its errors
//! 2. **Cache** (`cache`): tenant-scoped TTL memoization in front of a store
//!
//! Both layers implement or consume [`DatasourceSource`], so the cache can be
//! tested against a fake backend.

pub mod cache;
pub mod datasource;

use async_trait::async_trait;
use opstore_core::{Datasource, RequestContext};

use crate::opstorage::{GetDatasourceQuery, StorageError};

pub use cache::{CacheConfig, DatasourceCache};
pub use datasource::DatasourceStore;

// ---------------------------------------------------------------------------
// DatasourceError
// ---------------------------------------------------------------------------

/// Errors surfaced by datasource lookups.
#[derive(Debug, thiserror::Error)]
pub enum DatasourceError {
    #[error("data source not found")]
    NotFound,
    #[error("empty user session")]
    EmptySession,
    #[error("can not get data source by uid, uid is empty")]
    EmptyUid,
    #[error("can not get data source by uid, orgId is missing")]
    MissingOrgId,
    /// Neither an org nor any of id, uid, or name was given.
    #[error("datasource identifier not set")]
    IdentifierNotSet,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl DatasourceError {
    /// Whether the caller supplied an unusable lookup.
    #[must_use]
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::EmptyUid | Self::MissingOrgId | Self::IdentifierNotSet
        )
    }
}

// ---------------------------------------------------------------------------
// DatasourceSource
// ---------------------------------------------------------------------------

/// Backend the datasource cache fetches from on a miss.
#[async_trait]
pub trait DatasourceSource: Send + Sync {
    /// Fetches one datasource on behalf of the identity in `ctx`.
    async fn get_datasource(
        &self,
        ctx: &RequestContext,
        query: &GetDatasourceQuery,
    ) -> Result<Datasource, DatasourceError>;
}
