//! Error types for the simulator.
//!
//! [`SimError`] is what the [`ConversationController`](crate::controller::ConversationController)
//! surfaces to callers. Generation failures carry a [`GenerationError`] that
//! classifies what went wrong on the service side, so callers can tell an
//! expired key apart from a rate limit without parsing strings.

use std::path::PathBuf;

use thiserror::Error;

/// Failure of a single call to the text-generation service.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The request never produced an HTTP response (DNS, TLS, timeout, reset).
    #[error("request failed: {0}")]
    Transport(String),
    /// The service rejected the credential (HTTP 401/403).
    #[error("generation service rejected the credential (HTTP {status}): {body}")]
    Unauthorized { status: u16, body: String },
    /// The service is throttling us (HTTP 429).
    #[error("generation service rate limit exceeded: {0}")]
    RateLimited(String),
    /// Any other non-success HTTP status.
    #[error("generation service HTTP {status}: {body}")]
    Http { status: u16, body: String },
    /// The service answered 200 but reported an error in the payload.
    #[error("generation service error: {0}")]
    Api(String),
    /// The response body could not be decoded.
    #[error("malformed generation response: {0}")]
    Malformed(String),
    /// The response contained no candidate text.
    #[error("generation service returned no candidates")]
    EmptyResponse,
}

impl GenerationError {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            401 | 403 => GenerationError::Unauthorized { status, body },
            429 => GenerationError::RateLimited(body),
            _ => GenerationError::Http { status, body },
        }
    }
}

/// Top-level error for a simulated conversation.
#[derive(Debug, Error)]
pub enum SimError {
    /// The disease catalog or other startup configuration is unusable.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A call to the text-generation service failed.
    #[error(transparent)]
    Generation(#[from] GenerationError),
    /// The turn log could not be opened, written or read back.
    #[error("turn log '{}': {message}", path.display())]
    Persistence {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
    /// The doctor input stream failed.
    #[error("failed to read doctor input: {0}")]
    Input(#[source] std::io::Error),
    /// A controller operation was called in the wrong session state.
    #[error("invalid session state: {0}")]
    InvalidState(String),
}

impl SimError {
    pub fn configuration(message: impl Into<String>) -> Self {
        SimError::Configuration(message.into())
    }

    pub(crate) fn persistence_io(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        SimError::Persistence {
            path: path.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    pub(crate) fn persistence(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        SimError::Persistence {
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }
}
