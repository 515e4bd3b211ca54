use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// Inbound/outbound header carrying the tenant routing path.
pub const ROUTING_HEADER: &str = "X-REQUEST-CONTEXT";

/// Inbound/outbound cookie carrying the user session token.
pub const SESSION_COOKIE: &str = "user_session";

/// Per-request context carrying tenant routing and session identity.
/// Threaded through every storage call so outbound requests reach the right
/// backend instance on behalf of the right user.
///
/// Values are immutable: every `with_*` method returns a derived context and
/// leaves `self` untouched, so tasks spawned from the same parent never see
/// each other's later bindings. Unset fields read as empty strings.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Opaque path used by the reverse proxy to pick the backend instance.
    routing_path: Option<Arc<str>>,
    /// Opaque session credential forwarded to the backend.
    session_token: Option<Arc<str>>,
    /// Name of the store operation issuing outbound calls. Logging only.
    querier: Option<&'static str>,
    /// Fires when the caller abandons the operation.
    cancellation: CancellationToken,
}

impl RequestContext {
    /// Creates an empty context with a fresh cancellation token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a derived context with the routing path bound.
    #[must_use]
    pub fn with_routing_path(&self, routing_path: impl Into<Arc<str>>) -> Self {
        Self {
            routing_path: Some(routing_path.into()),
            ..self.clone()
        }
    }

    /// Returns the bound routing path, or `""` if none was bound.
    #[must_use]
    pub fn routing_path(&self) -> &str {
        self.routing_path.as_deref().unwrap_or_default()
    }

    /// Returns a derived context with the session token bound.
    #[must_use]
    pub fn with_session_token(&self, session_token: impl Into<Arc<str>>) -> Self {
        Self {
            session_token: Some(session_token.into()),
            ..self.clone()
        }
    }

    /// Returns the bound session token, or `""` if none was bound.
    #[must_use]
    pub fn session_token(&self) -> &str {
        self.session_token.as_deref().unwrap_or_default()
    }

    /// Whether a non-empty session token is bound.
    #[must_use]
    pub fn has_session(&self) -> bool {
        !self.session_token().is_empty()
    }

    /// Returns a derived context tagged with the calling operation's name.
    #[must_use]
    pub fn with_querier(&self, querier: &'static str) -> Self {
        Self {
            querier: Some(querier),
            ..self.clone()
        }
    }

    /// Returns the querier tag, or `""` if none was bound.
    #[must_use]
    pub fn querier(&self) -> &'static str {
        self.querier.unwrap_or_default()
    }

    /// Returns a derived context observing the given cancellation token.
    #[must_use]
    pub fn with_cancellation(&self, cancellation: CancellationToken) -> Self {
        Self {
            cancellation,
            ..self.clone()
        }
    }

    /// Token cancelled when the caller gives up on the operation.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}
