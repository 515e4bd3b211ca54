//! Typed façade over the external storage service.
//!
//! One [`OpStorage`] is built at startup from a [`StorageConfig`] and shared
//! by every store. Each entity family gets its own accessor
//! ([`OpStorage::datasource`]); all of them issue requests through the same
//! [`Client`], which carries the service API key and logs every round-trip.

pub mod datasource;

use std::time::Duration;

use http::header::{HeaderName, HeaderValue};
use tower::util::BoxCloneSyncService;
use tower::Layer;

use crate::client::{Client, ClientError, HttpTransport, LoggingLayer};

pub use datasource::{DatasourceStorage, GetDatasourceQuery};

/// Header authenticating this service to the storage backend.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Component name used in round-trip logs.
const COMPONENT: &str = "op-storage";

// ---------------------------------------------------------------------------
// StorageError
// ---------------------------------------------------------------------------

/// Errors produced by storage façade operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backend has no such entity.
    #[error("not found")]
    NotFound,
    /// The caller's context has no session token; no request was sent.
    #[error("empty user session")]
    EmptySession,
    #[error("{operation}: {source}")]
    Backend {
        operation: &'static str,
        #[source]
        source: ClientError,
    },
    #[error("{operation}: failed to decode response: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    /// Maps a client error, normalizing the not-found sentinel.
    pub(crate) fn from_client(operation: &'static str, err: ClientError) -> Self {
        if err.is_not_found() {
            Self::NotFound
        } else {
            Self::Backend {
                operation,
                source: err,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// StorageConfig
// ---------------------------------------------------------------------------

/// Connection settings for the storage backend.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Base address every endpoint path is joined onto.
    pub base_url: String,
    /// Sent as `X-API-Key` on every request. Omitted when empty.
    pub api_key: String,
    /// Upper bound on a single backend request.
    pub request_timeout: Option<Duration>,
    pub user_agent: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            api_key: String::new(),
            request_timeout: Some(Duration::from_secs(10)),
            user_agent: None,
        }
    }
}

// ---------------------------------------------------------------------------
// OpStorage
// ---------------------------------------------------------------------------

/// Entry point to the storage backend.
#[derive(Debug, Clone)]
pub struct OpStorage {
    datasource: DatasourceStorage,
}

impl OpStorage {
    /// Builds the façade over the default `reqwest` transport.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidHeader` if the API key or user agent
    /// cannot be sent as a header value.
    pub fn new(config: &StorageConfig) -> Result<Self, ClientError> {
        Self::with_transport(config, HttpTransport::default())
    }

    /// Builds the façade over a caller-supplied transport.
    ///
    /// # Errors
    ///
    /// See [`OpStorage::new`].
    pub fn with_transport(
        config: &StorageConfig,
        transport: HttpTransport,
    ) -> Result<Self, ClientError> {
        let logged = LoggingLayer::new(COMPONENT).layer(transport);
        let mut builder =
            Client::builder(config.base_url.clone()).transport(BoxCloneSyncService::new(logged));

        if !config.api_key.is_empty() {
            builder = builder.header(
                HeaderName::from_static(API_KEY_HEADER),
                header_value(API_KEY_HEADER, &config.api_key)?,
            );
        }
        if let Some(agent) = &config.user_agent {
            builder = builder.user_agent(header_value("user-agent", agent)?);
        }
        if let Some(timeout) = config.request_timeout {
            builder = builder.request_timeout(timeout);
        }

        Ok(Self::from_client(builder.build()))
    }

    /// Wraps an already configured client.
    #[must_use]
    pub fn from_client(client: Client) -> Self {
        Self {
            datasource: DatasourceStorage::new(client),
        }
    }

    #[must_use]
    pub fn datasource(&self) -> &DatasourceStorage {
        &self.datasource
    }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, ClientError> {
    HeaderValue::from_str(value).map_err(|e| ClientError::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })
}
