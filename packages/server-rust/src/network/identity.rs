//! Ingress identity extraction.
//!
//! [`identity_middleware`] binds the tenant routing path (from the
//! `X-REQUEST-CONTEXT` header) and the session token (from the
//! `user_session` cookie) into a fresh [`RequestContext`] stored in the
//! request extensions. Handlers read it back with the [`Identity`] extractor.

use std::convert::Infallible;

use axum::extract::{FromRequestParts, Request};
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use opstore_core::{RequestContext, ROUTING_HEADER, SESSION_COOKIE};
use serde_json::json;
use tokio_util::sync::CancellationToken;

/// Binds the caller's identity and a cancellation token to the request.
///
/// Missing header or cookie bind as empty strings. A routing header that is
/// not valid UTF-8 is rejected with `400`. The token fires when the request
/// future is dropped, which aborts outbound calls made on its behalf once the
/// client goes away.
pub async fn identity_middleware(mut req: Request, next: Next) -> Response {
    let ctx = match context_from_headers(req.headers()) {
        Ok(ctx) => ctx,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": err.to_string() })),
            )
                .into_response()
        }
    };

    let cancellation = CancellationToken::new();
    let _cancel_on_drop = cancellation.clone().drop_guard();
    req.extensions_mut()
        .insert(ctx.with_cancellation(cancellation));

    next.run(req).await
}

/// The routing header carried bytes that do not form UTF-8 text.
#[derive(Debug, thiserror::Error)]
#[error("X-REQUEST-CONTEXT header is not valid UTF-8")]
pub struct InvalidRoutingHeader;

/// Reads the routing header and session cookie from inbound headers.
///
/// The routing path is taken byte for byte, so non-ASCII tenant names are
/// forwarded unchanged.
///
/// # Errors
///
/// Returns [`InvalidRoutingHeader`] if the routing header is not UTF-8.
pub fn context_from_headers(
    headers: &HeaderMap,
) -> Result<RequestContext, InvalidRoutingHeader> {
    let routing_path = match headers.get(ROUTING_HEADER) {
        Some(value) => {
            std::str::from_utf8(value.as_bytes()).map_err(|_| InvalidRoutingHeader)?
        }
        None => "",
    };
    let session_token = cookie_value(headers, SESSION_COOKIE).unwrap_or_default();

    Ok(RequestContext::new()
        .with_routing_path(routing_path)
        .with_session_token(session_token))
}

/// First value of cookie `name` across all `Cookie` headers.
fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"'))
}

// ---------------------------------------------------------------------------
// Identity extractor
// ---------------------------------------------------------------------------

/// The request's [`RequestContext`]. Never rejects: without
/// [`identity_middleware`] it yields an empty context.
#[derive(Debug, Clone)]
pub struct Identity(pub RequestContext);

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .extensions
                .get::<RequestContext>()
                .cloned()
                .unwrap_or_default(),
        ))
    }
}

impl std::ops::Deref for Identity {
    type Target = RequestContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::HeaderValue;
    use axum::routing::get;
    use axum::{middleware, Router};
    use tower::ServiceExt;

    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, value.parse().unwrap());
        }
        map
    }

    #[test]
    fn reads_header_and_cookie() {
        let ctx = context_from_headers(&headers(&[
            ("x-request-context", "tenant-a/stack-1"),
            ("cookie", "theme=dark; user_session=abc123; other=1"),
        ]))
        .unwrap();
        assert_eq!(ctx.routing_path(), "tenant-a/stack-1");
        assert_eq!(ctx.session_token(), "abc123");
    }

    #[test]
    fn missing_values_bind_empty() {
        let ctx = context_from_headers(&HeaderMap::new()).unwrap();
        assert_eq!(ctx.routing_path(), "");
        assert_eq!(ctx.session_token(), "");
        assert!(!ctx.has_session());
    }

    #[test]
    fn session_found_in_any_cookie_header() {
        let ctx = context_from_headers(&headers(&[
            ("cookie", "theme=dark"),
            ("cookie", "user_session=s2"),
        ]))
        .unwrap();
        assert_eq!(ctx.session_token(), "s2");
    }

    #[test]
    fn cookie_name_must_match_exactly() {
        let ctx =
            context_from_headers(&headers(&[("cookie", "user_session_old=x")])).unwrap();
        assert!(!ctx.has_session());
    }

    #[test]
    fn non_ascii_routing_path_is_kept_verbatim() {
        let mut map = HeaderMap::new();
        map.insert(
            "x-request-context",
            HeaderValue::from_bytes("t\u{e9}nant/\u{65e5}".as_bytes()).unwrap(),
        );
        let ctx = context_from_headers(&map).unwrap();
        assert_eq!(ctx.routing_path(), "t\u{e9}nant/\u{65e5}");
    }

    #[test]
    fn non_utf8_routing_path_is_rejected() {
        let mut map = HeaderMap::new();
        map.insert(
            "x-request-context",
            HeaderValue::from_bytes(&[b't', 0xff]).unwrap(),
        );
        assert!(context_from_headers(&map).is_err());
    }

    async fn echo(Identity(ctx): Identity) -> String {
        format!("{}|{}", ctx.routing_path(), ctx.session_token())
    }

    #[tokio::test]
    async fn middleware_populates_extractor() {
        let app = Router::new()
            .route("/", get(echo))
            .layer(middleware::from_fn(identity_middleware));

        let req = Request::builder()
            .uri("/")
            .header("x-request-context", "t1")
            .header("cookie", "user_session=s1")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.as_ref(), b"t1|s1");
    }

    #[tokio::test]
    async fn middleware_rejects_non_utf8_routing_header() {
        let app = Router::new()
            .route("/", get(echo))
            .layer(middleware::from_fn(identity_middleware));

        let req = Request::builder()
            .uri("/")
            .header("x-request-context", HeaderValue::from_bytes(&[0xfe, 0xff]).unwrap())
            .header("cookie", "user_session=s1")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["message"], "X-REQUEST-CONTEXT header is not valid UTF-8");
    }

    #[tokio::test]
    async fn extractor_without_middleware_is_empty() {
        let app = Router::new().route("/", get(echo));
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let res = app.oneshot(req).await.unwrap();
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.as_ref(), b"|");
    }

    #[tokio::test]
    async fn token_is_live_during_handler() {
        async fn probe(Identity(ctx): Identity) -> String {
            ctx.cancellation().is_cancelled().to_string()
        }
        let app = Router::new()
            .route("/", get(probe))
            .layer(middleware::from_fn(identity_middleware));
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let res = app.oneshot(req).await.unwrap();
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.as_ref(), b"false");
    }
}
