//! Request-side interceptors: headers, cookies, and query strings.

use std::task::{Context, Poll};

use http::header::{HeaderName, HeaderValue, COOKIE};
use http::uri::{PathAndQuery, Uri};
use tower::{Layer, Service};

use super::{boxed, BoxInterceptor, HttpRequest};
use crate::client::error::ClientError;
use crate::client::query::QueryParams;

// ---------------------------------------------------------------------------
// RequestHeaderLayer
// ---------------------------------------------------------------------------

/// Sets (overwrites) one request header.
#[derive(Debug, Clone)]
pub struct RequestHeaderLayer {
    name: HeaderName,
    value: HeaderValue,
}

impl RequestHeaderLayer {
    #[must_use]
    pub fn new(name: HeaderName, value: HeaderValue) -> Self {
        Self { name, value }
    }

    /// Builds the layer from raw strings.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidHeader` if either part is not a valid
    /// header name or value.
    pub fn try_new(name: &str, value: &str) -> Result<Self, ClientError> {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| ClientError::InvalidHeader {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| ClientError::InvalidHeader {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(header_name, header_value))
    }
}

impl<S> Layer<S> for RequestHeaderLayer {
    type Service = RequestHeaderService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestHeaderService {
            inner,
            name: self.name.clone(),
            value: self.value.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestHeaderService<S> {
    inner: S,
    name: HeaderName,
    value: HeaderValue,
}

impl<S> Service<HttpRequest> for RequestHeaderService<S>
where
    S: Service<HttpRequest>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: HttpRequest) -> Self::Future {
        req.headers_mut()
            .insert(self.name.clone(), self.value.clone());
        self.inner.call(req)
    }
}

// ---------------------------------------------------------------------------
// RequestCookieLayer
// ---------------------------------------------------------------------------

/// Attaches one `name=value` cookie to the request.
///
/// Joins onto an existing `Cookie` header with `"; "` rather than adding a
/// second header line. The value is sanitized so it always stays a single
/// cookie (see [`sanitize_cookie_value`]).
#[derive(Debug, Clone)]
pub struct RequestCookieLayer {
    pair: String,
}

impl RequestCookieLayer {
    /// # Errors
    ///
    /// Returns `ClientError::InvalidHeader` if `name` is empty or not an
    /// RFC 7230 token.
    pub fn new(name: &str, value: &str) -> Result<Self, ClientError> {
        if name.is_empty() || !name.bytes().all(is_token_byte) {
            return Err(ClientError::InvalidHeader {
                name: COOKIE.to_string(),
                reason: format!("invalid cookie name {name:?}"),
            });
        }
        Ok(Self {
            pair: format!("{name}={}", sanitize_cookie_value(value)),
        })
    }
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

/// Cookie-octet subset accepted in a value: printable ASCII without `"`,
/// `;` and `\`. Space and comma are kept but force quoting.
fn is_cookie_value_byte(b: u8) -> bool {
    (0x20..0x7f).contains(&b) && b != b'"' && b != b';' && b != b'\\'
}

/// Drops bytes that cannot appear in a cookie value and quotes the result
/// when it contains a space or comma.
#[must_use]
pub fn sanitize_cookie_value(value: &str) -> String {
    let kept: String = value
        .bytes()
        .filter(|b| is_cookie_value_byte(*b))
        .map(char::from)
        .collect();
    if kept.contains([' ', ',']) {
        format!("\"{kept}\"")
    } else {
        kept
    }
}

impl<S> Layer<S> for RequestCookieLayer {
    type Service = RequestCookieService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestCookieService {
            inner,
            pair: self.pair.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestCookieService<S> {
    inner: S,
    pair: String,
}

impl<S> Service<HttpRequest> for RequestCookieService<S>
where
    S: Service<HttpRequest>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: HttpRequest) -> Self::Future {
        let joined = match req.headers().get(COOKIE).and_then(|v| v.to_str().ok()) {
            Some(existing) if !existing.is_empty() => format!("{existing}; {}", self.pair),
            _ => self.pair.clone(),
        };
        // The pair is printable ASCII, so only a malformed existing header
        // can make this fail.
        if let Ok(value) = HeaderValue::from_str(&joined) {
            req.headers_mut().insert(COOKIE, value);
        }
        self.inner.call(req)
    }
}

// ---------------------------------------------------------------------------
// QueryParamsLayer
// ---------------------------------------------------------------------------

/// Replaces the request's query string wholesale.
#[derive(Debug, Clone)]
pub struct QueryParamsLayer {
    query: String,
}

impl QueryParamsLayer {
    #[must_use]
    pub fn new(params: &QueryParams) -> Self {
        Self {
            query: params.encode(),
        }
    }
}

impl<S> Layer<S> for QueryParamsLayer {
    type Service = QueryParamsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        QueryParamsService {
            inner,
            query: self.query.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueryParamsService<S> {
    inner: S,
    query: String,
}

/// Rebuilds `uri` with its path kept and its query replaced.
fn replace_query(uri: &Uri, query: &str) -> Option<Uri> {
    let path = uri.path();
    let path_and_query = if query.is_empty() {
        PathAndQuery::try_from(path).ok()?
    } else {
        PathAndQuery::try_from(format!("{path}?{query}")).ok()?
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(path_and_query);
    Uri::from_parts(parts).ok()
}

impl<S> Service<HttpRequest> for QueryParamsService<S>
where
    S: Service<HttpRequest>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: HttpRequest) -> Self::Future {
        // The query is percent-encoded, so rebuilding cannot fail for a
        // request that already carried a valid URI.
        if let Some(uri) = replace_query(req.uri(), &self.query) {
            *req.uri_mut() = uri;
        }
        self.inner.call(req)
    }
}

// ---------------------------------------------------------------------------
// Constructors
// ---------------------------------------------------------------------------

/// Header interceptor from raw strings.
///
/// # Errors
///
/// Returns `ClientError::InvalidHeader` for an invalid name or value.
pub fn with_request_header(name: &str, value: &str) -> Result<BoxInterceptor, ClientError> {
    RequestHeaderLayer::try_new(name, value).map(boxed)
}

/// Cookie interceptor.
///
/// # Errors
///
/// Returns `ClientError::InvalidHeader` if `name` is not a valid cookie name.
pub fn with_request_cookie(name: &str, value: &str) -> Result<BoxInterceptor, ClientError> {
    RequestCookieLayer::new(name, value).map(boxed)
}

/// Query replacement interceptor.
#[must_use]
pub fn with_query_params(params: &QueryParams) -> BoxInterceptor {
    boxed(QueryParamsLayer::new(params))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
