//! Composable decorators around the request primitive.
//!
//! An interceptor is any [`tower::Layer`] over a [`Doer`]. The executor folds
//! the caller's interceptor list left to right, each one wrapping the pipeline
//! built so far, so the **last interceptor in the list is the outermost**:
//!
//! ```text
//! [I1, I2, I3]  =>  I3( I2( I1( transport ) ) )
//!
//! request:   I3 -> I2 -> I1 -> transport
//! response:  transport -> I1 -> I2 -> I3
//! ```
//!
//! A header interceptor listed after a status remap therefore runs before the
//! remap on the way in and after it on the way out.

pub mod request;
pub mod response;

use bytes::Bytes;
use tower::util::BoxCloneSyncService;
use tower::{Layer, Service};

pub use request::{
    with_query_params, with_request_cookie, with_request_header, QueryParamsLayer,
    RequestCookieLayer, RequestHeaderLayer,
};
pub use response::{with_status_error, StatusErrorLayer};

use super::error::ClientError;

/// Outbound request as seen by interceptors and transports.
pub type HttpRequest = http::Request<Bytes>;

/// Fully buffered response as seen by interceptors and transports.
pub type HttpResponse = http::Response<Bytes>;

/// The abstract "perform one request" primitive every interceptor wraps.
pub type Doer = BoxCloneSyncService<HttpRequest, HttpResponse, ClientError>;

/// A decorator that wraps one [`Doer`] into another.
pub trait Interceptor: Send + Sync {
    /// Wraps `next`, returning the decorated pipeline.
    fn intercept(&self, next: Doer) -> Doer;
}

impl<L> Interceptor for L
where
    L: Layer<Doer> + Send + Sync,
    L::Service: Service<HttpRequest, Response = HttpResponse, Error = ClientError>
        + Clone
        + Send
        + Sync
        + 'static,
    <L::Service as Service<HttpRequest>>::Future: Send + 'static,
{
    fn intercept(&self, next: Doer) -> Doer {
        BoxCloneSyncService::new(self.layer(next))
    }
}

/// Owned, type-erased interceptor.
pub type BoxInterceptor = Box<dyn Interceptor>;

/// Boxes any interceptor.
pub fn boxed<I: Interceptor + 'static>(interceptor: I) -> BoxInterceptor {
    Box::new(interceptor)
}

/// Builds the effective pipeline: `interceptors[n-1]` ends up outermost.
#[must_use]
pub fn compose(base: Doer, interceptors: &[BoxInterceptor]) -> Doer {
    interceptors
        .iter()
        .fold(base, |next, interceptor| interceptor.intercept(next))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
