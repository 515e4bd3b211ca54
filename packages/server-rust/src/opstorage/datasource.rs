//! Datasource endpoints of the storage backend.

use http::StatusCode;
use opstore_core::{Datasource, RequestContext, ROUTING_HEADER, SESSION_COOKIE};

use super::StorageError;
use crate::client::interceptor::{
    with_query_params, with_request_cookie, with_request_header, with_status_error,
};
use crate::client::{Client, ClientError, QueryParams};

const GET_DATASOURCE: &str = "datasource/getDatasource";

/// Lookup parameters for a single datasource.
///
/// Any one of `id`, `uid`, or `name` identifies the record; `org_id` scopes it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetDatasourceQuery {
    pub id: i64,
    pub uid: String,
    pub name: String,
    pub org_id: i64,
}

impl GetDatasourceQuery {
    #[must_use]
    pub fn by_id(id: i64, org_id: i64) -> Self {
        Self {
            id,
            org_id,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn by_uid(uid: impl Into<String>, org_id: i64) -> Self {
        Self {
            uid: uid.into(),
            org_id,
            ..Self::default()
        }
    }

    /// Whether at least one identifying field is set.
    #[must_use]
    pub fn has_identifier(&self) -> bool {
        self.id > 0 || !self.uid.is_empty() || !self.name.is_empty()
    }

    fn params(&self) -> QueryParams {
        let mut params = QueryParams::new();
        if self.id > 0 {
            params.set("id", self.id);
        }
        if !self.uid.is_empty() {
            params.set("uid", &self.uid);
        }
        if !self.name.is_empty() {
            params.set("name", &self.name);
        }
        params.set("org_id", self.org_id);
        params
    }
}

/// Datasource operations against the storage backend.
#[derive(Debug, Clone)]
pub struct DatasourceStorage {
    client: Client,
}

impl DatasourceStorage {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Fetches one datasource on behalf of the identity in `ctx`.
    ///
    /// A `204 No Content` answer means the record does not exist.
    ///
    /// # Errors
    ///
    /// - `EmptySession` if `ctx` carries no session token (nothing is sent)
    /// - `NotFound` if the backend has no matching record
    /// - `Backend` for any other request failure
    /// - `Decode` if the response body is not a datasource record
    pub async fn get_datasource(
        &self,
        ctx: &RequestContext,
        query: &GetDatasourceQuery,
    ) -> Result<Datasource, StorageError> {
        const OPERATION: &str = "GetDatasource";

        if !ctx.has_session() {
            return Err(StorageError::EmptySession);
        }

        let backend = |e: ClientError| StorageError::from_client(OPERATION, e);
        let interceptors = [
            with_query_params(&query.params()),
            with_status_error(StatusCode::NO_CONTENT, || ClientError::NotFound),
            with_request_header(ROUTING_HEADER, ctx.routing_path()).map_err(backend)?,
            with_request_cookie(SESSION_COOKIE, ctx.session_token()).map_err(backend)?,
        ];

        let body = self
            .client
            .get(ctx, GET_DATASOURCE, &interceptors)
            .await
            .map_err(backend)?;

        serde_json::from_slice(&body).map_err(|source| StorageError::Decode {
            operation: OPERATION,
            source,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::extract::{Query, State};
    use axum::http::HeaderMap;
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use axum::{Json, Router};
    use tokio::net::TcpListener;

    use super::*;
    use crate::opstorage::{OpStorage, StorageConfig};

    #[derive(Debug, Clone)]
    struct Seen {
        headers: HeaderMap,
        query: HashMap<String, String>,
    }

    type Log = Arc<Mutex<Vec<Seen>>>;

    async fn handler(
        State(log): State<Log>,
        headers: HeaderMap,
        Query(query): Query<HashMap<String, String>>,
    ) -> Response {
        log.lock().unwrap().push(Seen {
            headers,
            query: query.clone(),
        });
        match query.get("id").map(String::as_str) {
            Some("42") => Json(serde_json::json!({
                "id": 42,
                "uid": "u1",
                "orgId": 7,
                "name": "prom",
                "type": "prometheus",
                "jsonData": {"httpMethod": "POST"}
            }))
            .into_response(),
            Some("404") => (StatusCode::NOT_FOUND, "no route").into_response(),
            Some("500") => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
            Some("999") => (StatusCode::OK, "not json").into_response(),
            _ => StatusCode::NO_CONTENT.into_response(),
        }
    }

    async fn spawn_backend() -> (OpStorage, Log) {
        let log: Log = Arc::default();
        let router = Router::new()
            .route("/api/datasource/getDatasource", get(handler))
            .with_state(Arc::clone(&log));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let storage = OpStorage::new(&StorageConfig {
            base_url: format!("http://{addr}/api/"),
            api_key: "secret".to_string(),
            ..StorageConfig::default()
        })
        .unwrap();
        (storage, log)
    }

    fn ctx() -> RequestContext {
        RequestContext::new()
            .with_routing_path("tenant-a/stack-1")
            .with_session_token("sess-1")
    }

    #[tokio::test]
    async fn forwards_identity_api_key_and_query() {
        let (storage, log) = spawn_backend().await;

        let ds = storage
            .datasource()
            .get_datasource(&ctx(), &GetDatasourceQuery::by_id(42, 7))
            .await
            .unwrap();
        assert_eq!(ds.id, 42);
        assert_eq!(ds.uid, "u1");
        assert_eq!(ds.kind, "prometheus");

        let seen = log.lock().unwrap()[0].clone();
        assert_eq!(seen.headers["x-request-context"], "tenant-a/stack-1");
        assert_eq!(seen.headers["cookie"], "user_session=sess-1");
        assert_eq!(seen.headers["x-api-key"], "secret");
        assert_eq!(seen.query.get("id").map(String::as_str), Some("42"));
        assert_eq!(seen.query.get("org_id").map(String::as_str), Some("7"));
        assert!(!seen.query.contains_key("uid"));
        assert!(!seen.query.contains_key("name"));
    }

    #[tokio::test]
    async fn uid_lookup_omits_id() {
        let (storage, log) = spawn_backend().await;

        let err = storage
            .datasource()
            .get_datasource(&ctx(), &GetDatasourceQuery::by_uid("u9", 7))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));

        let seen = log.lock().unwrap()[0].clone();
        assert_eq!(seen.query.get("uid").map(String::as_str), Some("u9"));
        assert!(!seen.query.contains_key("id"));
    }

    #[tokio::test]
    async fn no_content_is_not_found() {
        let (storage, _log) = spawn_backend().await;
        let err = storage
            .datasource()
            .get_datasource(&ctx(), &GetDatasourceQuery::by_id(1, 7))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn plain_404_is_a_backend_error() {
        let (storage, _log) = spawn_backend().await;
        let err = storage
            .datasource()
            .get_datasource(&ctx(), &GetDatasourceQuery::by_id(404, 7))
            .await
            .unwrap_err();
        match err {
            StorageError::Backend { operation, source } => {
                assert_eq!(operation, "GetDatasource");
                assert_eq!(
                    source.to_string(),
                    "invalid status: 404 Not Found, message: no route"
                );
            }
            other => panic!("expected backend error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_error_carries_body() {
        let (storage, _log) = spawn_backend().await;
        let err = storage
            .datasource()
            .get_datasource(&ctx(), &GetDatasourceQuery::by_id(500, 7))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("message: boom"));
    }

    #[tokio::test]
    async fn malformed_body_is_decode_error() {
        let (storage, _log) = spawn_backend().await;
        let err = storage
            .datasource()
            .get_datasource(&ctx(), &GetDatasourceQuery::by_id(999, 7))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Decode { .. }));
    }

    #[tokio::test]
    async fn empty_session_sends_nothing() {
        let (storage, log) = spawn_backend().await;
        let ctx = RequestContext::new().with_routing_path("tenant-a");
        let err = storage
            .datasource()
            .get_datasource(&ctx, &GetDatasourceQuery::by_id(42, 7))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::EmptySession));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn identifier_detection() {
        assert!(!GetDatasourceQuery::default().has_identifier());
        assert!(GetDatasourceQuery::by_id(1, 0).has_identifier());
        assert!(GetDatasourceQuery::by_uid("u", 0).has_identifier());
        let by_name = GetDatasourceQuery {
            name: "prom".to_string(),
            ..GetDatasourceQuery::default()
        };
        assert!(by_name.has_identifier());
        assert_eq!(by_name.params().encode(), "name=prom&org_id=0");
    }
}
