//! Datasource lookup endpoints.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use opstore_core::Datasource;
use serde::Deserialize;
use serde_json::json;

use super::AppState;
use crate::client::ClientError;
use crate::network::identity::Identity;
use crate::opstorage::StorageError;
use crate::service::DatasourceError;

/// Query parameters shared by both lookup endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LookupParams {
    pub org_id: i64,
    pub skip_cache: bool,
}

/// `GET /api/datasources/{id}`
pub async fn get_datasource_handler(
    State(state): State<AppState>,
    Identity(ctx): Identity,
    Path(id): Path<i64>,
    Query(params): Query<LookupParams>,
) -> Result<Json<Arc<Datasource>>, ApiError> {
    let datasource = state
        .datasources
        .get_datasource(&ctx, id, params.org_id, params.skip_cache)
        .await?;
    Ok(Json(datasource))
}

/// `GET /api/datasources/uid/{uid}`
pub async fn get_datasource_by_uid_handler(
    State(state): State<AppState>,
    Identity(ctx): Identity,
    Path(uid): Path<String>,
    Query(params): Query<LookupParams>,
) -> Result<Json<Arc<Datasource>>, ApiError> {
    let datasource = state
        .datasources
        .get_datasource_by_uid(&ctx, &uid, params.org_id, params.skip_cache)
        .await?;
    Ok(Json(datasource))
}

// ---------------------------------------------------------------------------
// ApiError
// ---------------------------------------------------------------------------

/// Lookup failure rendered as `{"message": ...}` with a matching status.
#[derive(Debug)]
pub struct ApiError(pub DatasourceError);

impl From<DatasourceError> for ApiError {
    fn from(err: DatasourceError) -> Self {
        Self(err)
    }
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            DatasourceError::NotFound | DatasourceError::Storage(StorageError::NotFound) => {
                StatusCode::NOT_FOUND
            }
            DatasourceError::EmptySession
            | DatasourceError::Storage(StorageError::EmptySession) => StatusCode::UNAUTHORIZED,
            DatasourceError::EmptyUid
            | DatasourceError::MissingOrgId
            | DatasourceError::IdentifierNotSet => StatusCode::BAD_REQUEST,
            DatasourceError::Storage(StorageError::Backend {
                source: ClientError::Timeout { .. },
                ..
            }) => StatusCode::GATEWAY_TIMEOUT,
            DatasourceError::Storage(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "message": self.0.to_string() }))).into_response()
    }
}
