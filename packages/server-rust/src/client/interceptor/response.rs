//! Response-side interceptors.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use http::StatusCode;
use tower::{Layer, Service};

use super::{boxed, BoxInterceptor, HttpRequest, HttpResponse};
use crate::client::error::ClientError;

type MakeError = Arc<dyn Fn() -> ClientError + Send + Sync>;

// ---------------------------------------------------------------------------
// StatusErrorLayer
// ---------------------------------------------------------------------------

/// Replaces a successful call that answered with `status` by a designated error.
///
/// Transport errors from the inner call pass through untouched.
#[derive(Clone)]
pub struct StatusErrorLayer {
    status: StatusCode,
    make_error: MakeError,
}

impl StatusErrorLayer {
    pub fn new<F>(status: StatusCode, make_error: F) -> Self
    where
        F: Fn() -> ClientError + Send + Sync + 'static,
    {
        Self {
            status,
            make_error: Arc::new(make_error),
        }
    }

    /// Maps `status` to [`ClientError::NotFound`].
    #[must_use]
    pub fn not_found(status: StatusCode) -> Self {
        Self::new(status, || ClientError::NotFound)
    }
}

impl fmt::Debug for StatusErrorLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusErrorLayer")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl<S> Layer<S> for StatusErrorLayer {
    type Service = StatusErrorService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        StatusErrorService {
            inner,
            status: self.status,
            make_error: Arc::clone(&self.make_error),
        }
    }
}

// ---------------------------------------------------------------------------
// StatusErrorService
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct StatusErrorService<S> {
    inner: S,
    status: StatusCode,
    make_error: MakeError,
}

impl<S> Service<HttpRequest> for StatusErrorService<S>
where
    S: Service<HttpRequest, Response = HttpResponse, Error = ClientError>,
    S::Future: Send + 'static,
{
    type Response = HttpResponse;
    type Error = ClientError;
    type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, ClientError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: HttpRequest) -> Self::Future {
        let status = self.status;
        let make_error = Arc::clone(&self.make_error);
        let fut = self.inner.call(req);
        Box::pin(async move {
            let res = fut.await?;
            if res.status() == status {
                return Err(make_error());
            }
            Ok(res)
        })
    }
}

/// Status remap interceptor.
pub fn with_status_error<F>(status: StatusCode, make_error: F) -> BoxInterceptor
where
    F: Fn() -> ClientError + Send + Sync + 'static,
{
    boxed(StatusErrorLayer::new(status, make_error))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
