//! HTTP handler definitions for the ingress server.
//!
//! This module defines `AppState` (the shared state carried through axum
//! extractors) and re-exports all handler functions for convenient access
//! when building the router.

pub mod datasource;
pub mod health;

pub use datasource::{get_datasource_by_uid_handler, get_datasource_handler, ApiError};
pub use health::{health_handler, liveness_handler};

use std::sync::Arc;
use std::time::Instant;

use super::NetworkConfig;
use crate::service::DatasourceCache;

/// Shared application state passed to all axum handlers via `State` extraction.
///
/// Holds `Arc` references to shared resources so cloning is cheap.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Datasource lookups, cached per identity.
    pub datasources: Arc<DatasourceCache>,
    /// Network configuration (bind address, request timeout).
    pub config: Arc<NetworkConfig>,
    /// Server process start time, used for uptime calculation.
    pub start_time: Instant,
}
