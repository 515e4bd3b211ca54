//! HTTP ingress: configuration, identity extraction, handlers, and server
//! lifecycle.

pub mod config;
pub mod handlers;
pub mod identity;
pub mod middleware;
pub mod module;

pub use config::NetworkConfig;
pub use handlers::AppState;
pub use identity::{context_from_headers, identity_middleware, Identity, InvalidRoutingHeader};
pub use module::NetworkModule;
