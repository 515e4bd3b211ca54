//! Datasource store: validated, normalized access to the storage façade.

use async_trait::async_trait;
use opstore_core::{Datasource, RequestContext};
use tracing::error;

use super::{DatasourceError, DatasourceSource};
use crate::opstorage::{GetDatasourceQuery, OpStorage, StorageError};

/// Querier tag attached to outbound datasource lookups.
pub const GET_DATASOURCE_QUERIER: &str = "GetDataSource";

/// Read access to datasources held by the storage backend.
#[derive(Debug, Clone)]
pub struct DatasourceStore {
    storage: OpStorage,
}

impl DatasourceStore {
    #[must_use]
    pub fn new(storage: OpStorage) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl DatasourceSource for DatasourceStore {
    async fn get_datasource(
        &self,
        ctx: &RequestContext,
        query: &GetDatasourceQuery,
    ) -> Result<Datasource, DatasourceError> {
        let ctx = ctx.with_querier(GET_DATASOURCE_QUERIER);

        if query.org_id == 0 || !query.has_identifier() {
            return Err(DatasourceError::IdentifierNotSet);
        }

        match self.storage.datasource().get_datasource(&ctx, query).await {
            Ok(datasource) => Ok(datasource),
            Err(StorageError::NotFound) => Err(DatasourceError::NotFound),
            Err(StorageError::EmptySession) => Err(DatasourceError::EmptySession),
            Err(err) => {
                error!(
                    error = %err,
                    id = query.id,
                    uid = %query.uid,
                    name = %query.name,
                    org_id = query.org_id,
                    "failed getting data source"
                );
                Err(err.into())
            }
        }
    }
}
