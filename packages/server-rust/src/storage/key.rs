//! Tenant-scoped cache keys.

use std::sync::Arc;

use opstore_core::RequestContext;

/// Cache key namespaced by the caller's routing path and session token.
///
/// Compared structurally, so two tenants or two sessions can never share an
/// entry even when their lookup values collide or their identity strings
/// would concatenate to the same text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopedKey<L> {
    routing_path: Arc<str>,
    session_token: Arc<str>,
    lookup: L,
}

impl<L> ScopedKey<L> {
    /// Builds the key for `lookup` under the identity bound to `ctx`.
    pub fn new(ctx: &RequestContext, lookup: L) -> Self {
        Self {
            routing_path: Arc::from(ctx.routing_path()),
            session_token: Arc::from(ctx.session_token()),
            lookup,
        }
    }

    /// Same identity scope, different lookup value.
    #[must_use]
    pub fn rescope<M>(&self, lookup: M) -> ScopedKey<M> {
        ScopedKey {
            routing_path: Arc::clone(&self.routing_path),
            session_token: Arc::clone(&self.session_token),
            lookup,
        }
    }

    #[must_use]
    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    #[must_use]
    pub fn routing_path(&self) -> &str {
        &self.routing_path
    }
}
