//! Error types for the model normalizer

use thiserror::Error;

/// Main error type for normalizer operations
///
/// Every failure is scoped to a single reconciliation attempt or sweep pair;
/// nothing here terminates the controller.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Transport-level failure talking to the registry, storage tier or catalog
    #[error("http error: {0}")]
    Http(String),

    /// A remote endpoint answered with a non-success status
    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus {
        /// Request URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// A registry record does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// A remote payload did not have the expected shape
    #[error("decode error: {0}")]
    Decode(String),

    /// Rendering a catalog document failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Caller violated a contract (e.g. nothing to build an entity from)
    #[error("validation error: {0}")]
    Validation(String),

    /// The reconcile deadline expired
    #[error("timed out: {0}")]
    Timeout(String),
}

impl Error {
    /// Create an http error with the given message
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an unexpected status error
    pub fn unexpected_status(url: impl Into<String>, status: u16) -> Self {
        Self::UnexpectedStatus {
            url: url.into(),
            status,
        }
    }

    /// Create a not-found error with the given message
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a decode error with the given message
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a timeout error with the given message
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// True when the error means the record simply isn't there
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// True for outcomes an optional lookup degrades to "absent"
    ///
    /// Missing records and malformed payloads fall in this bucket. Transport
    /// failures do not: those must surface so the event gets redelivered.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Decode(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Http(err.to_string())
        }
    }
}
