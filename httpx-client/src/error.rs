//! Error types.

use thiserror::Error;

/// Result type for request building and execution.
pub type Result<T> = std::result::Result<T, HttpxError>;

/// Errors raised by a configuration call on a [`RequestBuilder`].
///
/// The first one raised is latched by the builder; every later
/// configuration call becomes a no-op and the error is surfaced by the
/// terminal call.
///
/// [`RequestBuilder`]: crate::RequestBuilder
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The request URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The method is not a valid HTTP token.
    #[error("Invalid HTTP method: {0:?}")]
    InvalidMethod(String),

    /// The header name is not a valid HTTP header name.
    #[error("Invalid header name: {0:?}")]
    InvalidHeaderName(String),

    /// The header value contains bytes not allowed in a header.
    #[error("Invalid value for header {name:?}")]
    InvalidHeaderValue {
        /// Header the value was meant for.
        name: String,
    },

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL-encoding of form or query values failed.
    #[error("URL encoding error: {0}")]
    UrlEncode(#[from] serde_urlencoded::ser::Error),

    /// A multipart file attachment could not be opened or copied.
    #[error("Multipart file {filename:?} for field {field:?}: {source}")]
    MultipartFile {
        /// Form field the file belongs to.
        field: String,
        /// Filename of the attachment.
        filename: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Writing the multipart body failed.
    #[error("Multipart encoding error: {0}")]
    Multipart(#[source] std::io::Error),
}

/// Errors reported by a [`Transport`](crate::Transport) while executing a
/// request.
///
/// HTTP error statuses are not transport errors; a 500 response is a
/// successful execution.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request context was cancelled before or during execution.
    #[error("Request cancelled")]
    Cancelled,

    /// The request context deadline elapsed.
    #[error("Request deadline exceeded")]
    DeadlineExceeded,

    /// Connection-level failure.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Error from the reqwest transport.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Error from a custom transport.
    #[error("Transport error: {0}")]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl TransportError {
    /// Wrap an arbitrary error from a custom transport.
    pub fn other(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Other(err.into())
    }

    /// Check if this is a timeout or deadline error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::DeadlineExceeded) || matches!(self, Self::Http(e) if e.is_timeout())
    }

    /// Check if this is a connection error.
    pub fn is_connect(&self) -> bool {
        matches!(self, Self::Connection(_)) || matches!(self, Self::Http(e) if e.is_connect())
    }

    /// Check if the request context was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Error returned by the terminal builder operations.
#[derive(Debug, Error)]
pub enum HttpxError {
    /// A latched configuration error surfaced at build time.
    #[error("Failed to build request: {0}")]
    Build(#[from] ConfigError),

    /// The last transport error after all attempts were used.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl HttpxError {
    /// Check if this error came from building the request.
    pub fn is_build(&self) -> bool {
        matches!(self, Self::Build(_))
    }

    /// Check if this error came from the transport.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// The configuration error, if this is a build error.
    pub fn as_config(&self) -> Option<&ConfigError> {
        match self {
            Self::Build(e) => Some(e),
            Self::Transport(_) => None,
        }
    }

    /// The transport error, if this is a transport error.
    pub fn as_transport(&self) -> Option<&TransportError> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Build(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_predicates() {
        assert!(TransportError::Cancelled.is_cancelled());
        assert!(TransportError::DeadlineExceeded.is_timeout());
        assert!(TransportError::Connection("refused".into()).is_connect());
        assert!(!TransportError::other("boom").is_connect());
    }

    #[test]
    fn test_custom_transport_io_failure() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err = TransportError::other(io);

        assert!(matches!(err, TransportError::Other(_)));
        assert_eq!(err.to_string(), "Transport error: pipe closed");
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_httpx_error_kind() {
        let err = HttpxError::from(ConfigError::InvalidMethod("BAD METHOD".into()));
        assert!(err.is_build());
        assert!(err.as_config().is_some());
        assert!(err.as_transport().is_none());

        let err = HttpxError::from(TransportError::Connection("reset".into()));
        assert!(err.is_transport());
        assert_eq!(err.to_string(), "Connection error: reset");
    }
}
