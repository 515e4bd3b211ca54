//! HTTP request executor with a composable interceptor pipeline.
//!
//! [`Client`] joins a base address with an endpoint path, builds the request,
//! applies client-level headers, runs the caller's interceptors around the
//! transport, and normalizes the outcome:
//!
//! - transport failure: the error is returned unchanged (single attempt)
//! - status 200 / 201: the response body is returned
//! - any other status: [`ClientError::Status`] carrying the body text
//!
//! Cancellation is taken from the caller's [`RequestContext`].

pub mod error;
pub mod interceptor;
pub mod query;
pub mod transport;

use std::time::Duration;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, USER_AGENT};
use http::uri::PathAndQuery;
use http::{HeaderMap, Method, StatusCode, Uri};
use opstore_core::RequestContext;
use tower::ServiceExt;

pub use error::{BoxError, ClientError};
pub use interceptor::{BoxInterceptor, Doer, HttpRequest, HttpResponse, Interceptor};
pub use query::QueryParams;
pub use transport::{HttpTransport, LoggingLayer, Querier};

/// Joins `endpoint` onto the path of `base`.
///
/// The joined path is cleaned: empty and `.` segments are dropped and `..`
/// removes the preceding segment (never climbing above `/`). A trailing
/// slash on `endpoint` is kept.
///
/// # Errors
///
/// Returns `ClientError::InvalidUrl` if `base` is not a valid URI, carries a
/// query string, or the joined path is not a valid URI path.
pub fn join_url(base: &str, endpoint: &str) -> Result<Uri, ClientError> {
    let invalid = |reason: String| ClientError::InvalidUrl {
        url: base.to_string(),
        reason,
    };
    let base_uri = base
        .parse::<Uri>()
        .map_err(|e| invalid(e.to_string()))?;
    if base_uri.query().is_some() {
        return Err(invalid("base address must not carry a query".to_string()));
    }

    let path = clean_path(base_uri.path(), endpoint);
    let mut parts = base_uri.into_parts();
    parts.path_and_query = Some(
        PathAndQuery::try_from(path.as_str()).map_err(|e| invalid(e.to_string()))?,
    );
    Uri::from_parts(parts).map_err(|e| invalid(e.to_string()))
}

fn clean_path(base_path: &str, endpoint: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in base_path.split('/').chain(endpoint.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }
    let mut path = format!("/{}", segments.join("/"));
    if endpoint.ends_with('/') && !segments.is_empty() {
        path.push('/');
    }
    path
}

/// Whether `status` is in the success allow-list.
#[must_use]
pub fn is_valid_status(status: StatusCode) -> bool {
    status == StatusCode::OK || status == StatusCode::CREATED
}

// ---------------------------------------------------------------------------
// ClientBuilder
// ---------------------------------------------------------------------------

/// Builder for [`Client`].
pub struct ClientBuilder {
    base_url: String,
    headers: HeaderMap,
    transport: Option<Doer>,
    request_timeout: Option<Duration>,
}

impl ClientBuilder {
    /// Adds or replaces a header sent with every request.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Rewrites the `User-Agent` header.
    #[must_use]
    pub fn user_agent(self, value: HeaderValue) -> Self {
        self.header(USER_AGENT, value)
    }

    /// Replaces the base transport. Defaults to [`HttpTransport::default`].
    #[must_use]
    pub fn transport(mut self, transport: Doer) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Bounds each request's total duration.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn build(self) -> Client {
        Client {
            base_url: self.base_url,
            headers: self.headers,
            transport: self
                .transport
                .unwrap_or_else(|| HttpTransport::default().into_doer()),
            request_timeout: self.request_timeout,
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Single-attempt HTTP request executor.
///
/// Cheap to clone; clones share the transport.
#[derive(Clone)]
pub struct Client {
    base_url: String,
    headers: HeaderMap,
    transport: Doer,
    request_timeout: Option<Duration>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl Client {
    #[must_use]
    pub fn builder(base_url: impl Into<String>) -> ClientBuilder {
        ClientBuilder {
            base_url: base_url.into(),
            headers: HeaderMap::new(),
            transport: None,
            request_timeout: None,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Performs a GET request.
    ///
    /// # Errors
    ///
    /// See [`Client::execute`].
    pub async fn get(
        &self,
        ctx: &RequestContext,
        endpoint: &str,
        interceptors: &[BoxInterceptor],
    ) -> Result<Bytes, ClientError> {
        self.execute(ctx, Method::GET, endpoint, Bytes::new(), interceptors)
            .await
    }

    /// Performs a DELETE request.
    ///
    /// # Errors
    ///
    /// See [`Client::execute`].
    pub async fn delete(
        &self,
        ctx: &RequestContext,
        endpoint: &str,
        interceptors: &[BoxInterceptor],
    ) -> Result<Bytes, ClientError> {
        self.execute(ctx, Method::DELETE, endpoint, Bytes::new(), interceptors)
            .await
    }

    /// Performs a POST request with `body`.
    ///
    /// # Errors
    ///
    /// See [`Client::execute`].
    pub async fn post(
        &self,
        ctx: &RequestContext,
        endpoint: &str,
        body: impl Into<Bytes>,
        interceptors: &[BoxInterceptor],
    ) -> Result<Bytes, ClientError> {
        self.execute(ctx, Method::POST, endpoint, body.into(), interceptors)
            .await
    }

    /// Runs one request through the interceptor pipeline.
    ///
    /// `interceptors[n-1]` is the outermost wrapper; see
    /// [`interceptor`](self::interceptor) for the ordering contract.
    ///
    /// # Errors
    ///
    /// - `InvalidUrl` / `InvalidRequest` if the request cannot be built
    /// - any error produced by an interceptor or the transport, unchanged
    /// - `Status` for a status outside 200 / 201
    /// - `Cancelled` if the context's cancellation token fires first
    /// - `Timeout` if the configured request timeout elapses first
    pub async fn execute(
        &self,
        ctx: &RequestContext,
        method: Method,
        endpoint: &str,
        body: Bytes,
        interceptors: &[BoxInterceptor],
    ) -> Result<Bytes, ClientError> {
        let uri = join_url(&self.base_url, endpoint)?;
        let mut request = http::Request::builder()
            .method(method)
            .uri(uri)
            .body(body)?;
        request.headers_mut().extend(self.headers.clone());
        request.extensions_mut().insert(Querier(ctx.querier()));

        let pipeline = interceptor::compose(self.transport.clone(), interceptors);
        let call = pipeline.oneshot(request);

        let response = tokio::select! {
            biased;
            () = ctx.cancellation().cancelled() => return Err(ClientError::Cancelled),
            result = self.with_timeout(call) => result?,
        };

        let status = response.status();
        let body = response.into_body();
        if is_valid_status(status) {
            Ok(body)
        } else {
            Err(ClientError::status(status, &body))
        }
    }

    async fn with_timeout<F>(&self, call: F) -> Result<HttpResponse, ClientError>
    where
        F: std::future::Future<Output = Result<HttpResponse, ClientError>>,
    {
        match self.request_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, call).await {
                Ok(result) => result,
                Err(_elapsed) => Err(ClientError::Timeout {
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                }),
            },
            None => call.await,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use proptest::prelude::*;
    use tokio_util::sync::CancellationToken;
    use tower::service_fn;
    use tower::util::BoxCloneSyncService;

    use super::interceptor::{boxed, with_request_header, StatusErrorLayer};
    use super::*;

    type Seen = Arc<Mutex<Vec<HttpRequest>>>;

    /// Transport answering every request with `status` and `body`.
    fn stub(seen: Seen, status: StatusCode, body: &'static str) -> Doer {
        BoxCloneSyncService::new(service_fn(move |req: HttpRequest| {
            let seen = Arc::clone(&seen);
            async move {
                seen.lock().unwrap().push(req);
                Ok::<_, ClientError>(
                    http::Response::builder()
                        .status(status)
                        .body(Bytes::from_static(body.as_bytes()))
                        .unwrap(),
                )
            }
        }))
    }

    /// Transport that never answers.
    fn hanging() -> Doer {
        BoxCloneSyncService::new(service_fn(|_req: HttpRequest| async move {
            std::future::pending::<Result<HttpResponse, ClientError>>().await
        }))
    }

    fn client(transport: Doer) -> Client {
        Client::builder("http://storage:8080/api/")
            .header(
                HeaderName::from_static("x-api-key"),
                HeaderValue::from_static("k1"),
            )
            .user_agent(HeaderValue::from_static("opstore-test"))
            .transport(transport)
            .build()
    }

    #[test]
    fn join_url_never_doubles_or_drops_slashes() {
        let cases = [
            ("http://h/api", "ds/get", "http://h/api/ds/get"),
            ("http://h/api/", "ds/get", "http://h/api/ds/get"),
            ("http://h/api/", "/ds/get", "http://h/api/ds/get"),
            ("http://h/api", "/ds/get/", "http://h/api/ds/get/"),
            ("http://h", "ds", "http://h/ds"),
        ];
        for (base, endpoint, expected) in cases {
            assert_eq!(join_url(base, endpoint).unwrap().to_string(), expected);
        }
    }

    #[test]
    fn join_url_cleans_dot_segments() {
        let cases = [
            ("http://h/api/", "../admin", "http://h/admin"),
            ("http://h/api", "./ds/./get", "http://h/api/ds/get"),
            ("http://h/api", "ds/../get", "http://h/api/get"),
            ("http://h/", "../../x", "http://h/x"),
            ("http://h/api", "", "http://h/api"),
        ];
        for (base, endpoint, expected) in cases {
            assert_eq!(join_url(base, endpoint).unwrap().to_string(), expected);
        }
    }

    #[test]
    fn join_url_rejects_base_with_query() {
        let err = join_url("http://h/api?x=1", "ds/get").unwrap_err();
        assert!(matches!(err, ClientError::InvalidUrl { ref url, .. } if url == "http://h/api?x=1"));
    }

    #[test]
    fn join_url_rejects_garbage() {
        let err = join_url("http://h h", "x").unwrap_err();
        assert!(matches!(err, ClientError::InvalidUrl { .. }));
    }

    #[test]
    fn only_200_and_201_are_success() {
        assert!(is_valid_status(StatusCode::OK));
        assert!(is_valid_status(StatusCode::CREATED));
        assert!(!is_valid_status(StatusCode::NO_CONTENT));
        assert!(!is_valid_status(StatusCode::ACCEPTED));
        assert!(!is_valid_status(StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn get_returns_body_and_applies_client_headers() {
        let seen: Seen = Arc::default();
        let client = client(stub(Arc::clone(&seen), StatusCode::OK, "{\"id\":1}"));
        let ctx = RequestContext::new().with_querier("GetDataSource");

        let body = client.get(&ctx, "datasource/getDatasource", &[]).await.unwrap();
        assert_eq!(body.as_ref(), b"{\"id\":1}");

        let seen = seen.lock().unwrap();
        let req = &seen[0];
        assert_eq!(req.method(), Method::GET);
        assert_eq!(
            req.uri().to_string(),
            "http://storage:8080/api/datasource/getDatasource"
        );
        assert_eq!(req.headers()["x-api-key"], "k1");
        assert_eq!(req.headers()[USER_AGENT], "opstore-test");
        assert_eq!(
            req.extensions().get::<Querier>(),
            Some(&Querier("GetDataSource"))
        );
    }

    #[tokio::test]
    async fn post_sends_body_and_accepts_created() {
        let seen: Seen = Arc::default();
        let client = client(stub(Arc::clone(&seen), StatusCode::CREATED, "{}"));

        let body = client
            .post(&RequestContext::new(), "dashboard/save", "{\"a\":1}", &[])
            .await
            .unwrap();
        assert_eq!(body.as_ref(), b"{}");

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].method(), Method::POST);
        assert_eq!(seen[0].body().as_ref(), b"{\"a\":1}");
    }

    #[tokio::test]
    async fn delete_uses_delete_method() {
        let seen: Seen = Arc::default();
        let client = client(stub(Arc::clone(&seen), StatusCode::OK, ""));
        client
            .delete(&RequestContext::new(), "dashboard/delete", &[])
            .await
            .unwrap();
        assert_eq!(seen.lock().unwrap()[0].method(), Method::DELETE);
    }

    #[tokio::test]
    async fn error_status_carries_body_text() {
        let client = client(stub(Arc::default(), StatusCode::BAD_GATEWAY, "upstream down"));
        let err = client
            .get(&RequestContext::new(), "x", &[])
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid status: 502 Bad Gateway, message: upstream down"
        );
    }

    #[tokio::test]
    async fn error_status_without_body_carries_status_line() {
        let client = client(stub(Arc::default(), StatusCode::NOT_FOUND, ""));
        let err = client
            .get(&RequestContext::new(), "x", &[])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid status: 404 Not Found");
    }

    #[tokio::test]
    async fn no_content_without_remap_is_an_error() {
        let client = client(stub(Arc::default(), StatusCode::NO_CONTENT, ""));
        let err = client
            .get(&RequestContext::new(), "x", &[])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Status {
                status: StatusCode::NO_CONTENT,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn no_content_with_remap_is_not_found() {
        let client = client(stub(Arc::default(), StatusCode::NO_CONTENT, "ignored"));
        let interceptors = [
            boxed(StatusErrorLayer::not_found(StatusCode::NO_CONTENT)),
            with_request_header("X-REQUEST-CONTEXT", "tenant-a").unwrap(),
        ];
        let err = client
            .get(&RequestContext::new(), "x", &interceptors)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NotFound));
    }

    #[tokio::test]
    async fn transport_error_propagates_unchanged() {
        let failing = BoxCloneSyncService::new(service_fn(|_req: HttpRequest| async move {
            Err::<HttpResponse, _>(ClientError::transport("connection reset"))
        }));
        let err = client(failing)
            .get(&RequestContext::new(), "x", &[])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "transport error: connection reset");
    }

    #[tokio::test]
    async fn cancellation_aborts_in_flight_request() {
        let token = CancellationToken::new();
        let ctx = RequestContext::new().with_cancellation(token.clone());
        let client = client(hanging());

        let call = tokio::spawn(async move { client.get(&ctx, "slow", &[]).await });
        tokio::task::yield_now().await;
        token.cancel();

        let err = call.await.unwrap().unwrap_err();
        assert!(matches!(err, ClientError::Cancelled));
    }

    #[tokio::test]
    async fn already_cancelled_context_never_reaches_transport() {
        let seen: Seen = Arc::default();
        let client = client(stub(Arc::clone(&seen), StatusCode::OK, ""));
        let ctx = RequestContext::new();
        ctx.cancellation().cancel();

        let err = client.get(&ctx, "x", &[]).await.unwrap_err();
        assert!(matches!(err, ClientError::Cancelled));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn request_timeout_is_enforced() {
        let client = Client::builder("http://storage")
            .transport(hanging())
            .request_timeout(Duration::from_millis(50))
            .build();
        let err = client
            .get(&RequestContext::new(), "slow", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Timeout { timeout_ms: 50 }));
    }

    proptest! {
        #[test]
        fn joined_path_has_single_separator(
            base_slashes in 0usize..3,
            lead_slashes in 0usize..3,
            segment in "[a-z]{1,8}(/[a-z]{1,8}){0,2}",
        ) {
            let base = format!("http://h/api{}", "/".repeat(base_slashes));
            let endpoint = format!("{}{segment}", "/".repeat(lead_slashes));
            let uri = join_url(&base, &endpoint).unwrap();
            prop_assert_eq!(uri.path(), format!("/api/{segment}"));
        }
    }
}
