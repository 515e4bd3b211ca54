//! Network module with deferred startup lifecycle.
//!
//! Implements the deferred startup pattern: `new()` creates resources,
//! `start()` binds the TCP listener, and `serve()` starts accepting
//! connections. This separation lets the caller learn the bound port (and
//! log it) before traffic is accepted.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::routing::get;
use axum::{middleware, Router};
use tokio::net::TcpListener;
use tracing::info;

use super::config::NetworkConfig;
use super::handlers::{
    get_datasource_by_uid_handler, get_datasource_handler, health_handler, liveness_handler,
    AppState,
};
use super::identity::identity_middleware;
use super::middleware::build_http_layers;
use crate::service::DatasourceCache;

/// Manages the HTTP server lifecycle.
///
/// 1. `new()` -- captures configuration and shared services
/// 2. `start()` -- binds TCP listener to the configured address
/// 3. `serve()` -- accepts connections until shutdown is signalled
pub struct NetworkModule {
    config: NetworkConfig,
    listener: Option<TcpListener>,
    datasources: Arc<DatasourceCache>,
}

impl NetworkModule {
    /// Creates a new network module without binding any port.
    #[must_use]
    pub fn new(config: NetworkConfig, datasources: Arc<DatasourceCache>) -> Self {
        Self {
            config,
            listener: None,
            datasources,
        }
    }

    /// Assembles the axum router with all routes and middleware.
    ///
    /// Routes:
    /// - `GET /health` -- health JSON
    /// - `GET /health/live` -- liveness probe
    /// - `GET /api/datasources/{id}` -- datasource by id
    /// - `GET /api/datasources/uid/{uid}` -- datasource by uid
    ///
    /// The `/api` routes run behind identity extraction.
    pub fn build_router(&self) -> Router {
        let state = AppState {
            datasources: Arc::clone(&self.datasources),
            config: Arc::new(self.config.clone()),
            start_time: Instant::now(),
        };

        let api = Router::new()
            .route("/api/datasources/{id}", get(get_datasource_handler))
            .route(
                "/api/datasources/uid/{uid}",
                get(get_datasource_by_uid_handler),
            )
            .route_layer(middleware::from_fn(identity_middleware));

        Router::new()
            .route("/health", get(health_handler))
            .route("/health/live", get(liveness_handler))
            .merge(api)
            .layer(build_http_layers(&self.config))
            .with_state(state)
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the actual bound port, which may differ from the configured
    /// port when port 0 is used (OS-assigned ephemeral port).
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound (e.g., port in use).
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves connections until the shutdown signal fires, then lets
    /// in-flight requests finish.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called first or the server
    /// encounters a fatal I/O error.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let Some(listener) = self.listener.take() else {
            anyhow::bail!("start() must be called before serve()");
        };
        let router = self.build_router();

        info!("Serving HTTP connections");
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;
        info!("HTTP server stopped");
        Ok(())
    }
}
