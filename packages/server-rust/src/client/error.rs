use http::StatusCode;

/// Boxed error produced by a transport implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned by the request executor and its interceptors.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Entity absent. Produced by a status remap, never by the executor itself.
    #[error("not found")]
    NotFound,
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("invalid request parameters: {0}")]
    InvalidRequest(#[from] http::Error),
    #[error("invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },
    /// The transport failed before a response was received.
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),
    /// The backend answered with a status outside the success allow-list.
    #[error(
        "invalid status: {status}{}",
        .message.as_deref().map(|m| format!(", message: {m}")).unwrap_or_default()
    )]
    Status {
        status: StatusCode,
        message: Option<String>,
    },
    #[error("failed to read response body: {0}")]
    Body(#[source] BoxError),
    #[error("request cancelled")]
    Cancelled,
    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

impl ClientError {
    /// Builds a status error, using the body text as the message when present.
    #[must_use]
    pub fn status(status: StatusCode, body: &[u8]) -> Self {
        let message = if body.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(body).into_owned())
        };
        Self::Status { status, message }
    }

    /// Wraps any transport failure.
    pub fn transport(err: impl Into<BoxError>) -> Self {
        Self::Transport(err.into())
    }

    /// Whether this error is the not-found sentinel.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}
