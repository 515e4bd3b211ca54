//! Base transport and round-trip logging.
//!
//! [`HttpTransport`] is the innermost [`Doer`]: it performs exactly one
//! request through `reqwest` and buffers the response. Retries, TLS, and
//! connection pooling policy belong to the `reqwest::Client` it is given.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use http::Method;
use tower::util::BoxCloneSyncService;
use tower::{Layer, Service};
use tracing::debug;

use super::error::ClientError;
use super::interceptor::{Doer, HttpRequest, HttpResponse};

/// Request extension naming the store operation that issued the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Querier(pub &'static str);

// ---------------------------------------------------------------------------
// HttpTransport
// ---------------------------------------------------------------------------

/// `reqwest`-backed transport.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Type-erases the transport into the pipeline's base primitive.
    #[must_use]
    pub fn into_doer(self) -> Doer {
        BoxCloneSyncService::new(self)
    }
}

impl Service<HttpRequest> for HttpTransport {
    type Response = HttpResponse;
    type Error = ClientError;
    type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, ClientError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: HttpRequest) -> Self::Future {
        let client = self.client.clone();
        Box::pin(async move {
            let req = reqwest::Request::try_from(req).map_err(ClientError::transport)?;
            let res = client.execute(req).await.map_err(ClientError::transport)?;

            let status = res.status();
            let version = res.version();
            let headers = res.headers().clone();
            let body = res
                .bytes()
                .await
                .map_err(|e| ClientError::Body(e.into()))?;

            let mut response = http::Response::new(body);
            *response.status_mut() = status;
            *response.version_mut() = version;
            *response.headers_mut() = headers;
            Ok(response)
        })
    }
}

// ---------------------------------------------------------------------------
// LoggingLayer
// ---------------------------------------------------------------------------

/// Logs every outbound round-trip at `debug` level.
///
/// POST and PUT requests also log their payload. Sits beneath the interceptor
/// pipeline, so it sees the fully decorated request.
#[derive(Debug, Clone, Copy)]
pub struct LoggingLayer {
    component: &'static str,
}

impl LoggingLayer {
    #[must_use]
    pub fn new(component: &'static str) -> Self {
        Self { component }
    }
}

impl<S> Layer<S> for LoggingLayer {
    type Service = LoggingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LoggingService {
            inner,
            component: self.component,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingService<S> {
    inner: S,
    component: &'static str,
}

impl<S> Service<HttpRequest> for LoggingService<S>
where
    S: Service<HttpRequest>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: HttpRequest) -> Self::Future {
        let querier = req.extensions().get::<Querier>().map_or("", |q| q.0);
        if matches!(*req.method(), Method::POST | Method::PUT) {
            debug!(
                component = self.component,
                querier,
                method = %req.method(),
                url = %req.uri(),
                payload = %String::from_utf8_lossy(req.body()),
                "roundtrip"
            );
        } else {
            debug!(
                component = self.component,
                querier,
                method = %req.method(),
                url = %req.uri(),
                "roundtrip"
            );
        }
        self.inner.call(req)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
