use crate::auth::AuthKind;
use crate::response::HttpResponse;
use std::time::Duration;
use thiserror::Error;

/// Classification of URL validation failures.
///
/// Provides programmatic matching for different failure modes without
/// relying on unstable error message strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvalidUriKind {
    /// URL could not be parsed (malformed syntax)
    ParseError,
    /// URL is missing required host/authority component
    MissingAuthority,
    /// URL is missing required scheme (http/https)
    MissingScheme,
}

/// Errors produced by the request pipeline.
///
/// Variants group into five families:
///
/// | Family        | Variants                                                              |
/// |---------------|-----------------------------------------------------------------------|
/// | usage         | `Usage`, `InvalidHeaderName`, `InvalidHeaderValue`, `InvalidUri`, `InvalidScheme`, `RequestBuild`, `NotImplemented` |
/// | serialization | `Json`, `FormEncode`, `Decode`                                        |
/// | io            | `Io`, `BodyRead`, `BodyTooLarge`                                      |
/// | transport     | `Transport`, `Tls`, `Timeout`, `Cancelled`                            |
/// | status        | `Status`                                                              |
///
/// `Status` and `Decode` still carry the received response, reachable via
/// [`HttpError::response`] and [`HttpError::into_response`].
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HttpError {
    /// The request options were combined in an unsupported way
    #[error("Invalid request usage: {0}")]
    Usage(String),

    /// Request building failed
    #[error("Failed to build request: {0}")]
    RequestBuild(#[from] http::Error),

    /// Invalid header name
    #[error("Invalid header name: {0}")]
    InvalidHeaderName(#[from] http::header::InvalidHeaderName),

    /// Invalid header value
    #[error("Invalid header value: {0}")]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),

    /// Invalid URL (failed to parse)
    ///
    /// Use the `kind` field for programmatic matching. The `reason` field is
    /// a diagnostic message; its format is unstable.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUri {
        /// The URL that failed to parse
        url: String,
        /// Structured failure classification for programmatic matching
        kind: InvalidUriKind,
        /// Diagnostic message (unstable format, for logging only)
        reason: String,
    },

    /// Invalid URL scheme for transport security configuration
    #[error("URL scheme '{scheme}' not allowed: {reason}")]
    InvalidScheme {
        /// The URL scheme that was rejected
        scheme: String,
        /// Reason the scheme was rejected
        reason: String,
    },

    /// Authentication scheme is recognized but not supported
    #[error("{0:?} authentication is not implemented")]
    NotImplemented(AuthKind),

    /// JSON serialization of the request body failed
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Form URL encoding error
    #[error("Form encoding failed: {0}")]
    FormEncode(#[from] serde_urlencoded::ser::Error),

    /// Response body was received but could not be decoded into the JSON sink
    #[error("Failed to decode response body: {source}")]
    Decode {
        /// Underlying parser error
        #[source]
        source: serde_json::Error,
        /// The successfully received response
        response: Box<HttpResponse>,
    },

    /// Reading a request body source (file, reader) failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Draining the response body failed
    #[error("Failed to read response body: {0}")]
    BodyRead(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Response body exceeded size limit
    #[error("Response body too large: limit {limit} bytes, got {actual} bytes")]
    BodyTooLarge { limit: usize, actual: usize },

    /// Transport error (network, connection, etc)
    #[error("Transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// TLS error
    #[error("TLS error: {0}")]
    Tls(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The call deadline elapsed before the response was received
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The call was cancelled through its cancellation token
    #[error("Request cancelled")]
    Cancelled,

    /// HTTP non-2xx status
    #[error("HTTP {status}: {body_preview}")]
    Status {
        status: http::StatusCode,
        body_preview: String,
        response: Box<HttpResponse>,
    },
}

impl HttpError {
    /// Response attached to this error, if the server answered.
    ///
    /// Only `Status` and `Decode` carry a response; transport and usage
    /// failures never do.
    #[must_use]
    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            Self::Status { response, .. } | Self::Decode { response, .. } => Some(response),
            _ => None,
        }
    }

    /// Consume the error and return the attached response, if any.
    #[must_use]
    pub fn into_response(self) -> Option<HttpResponse> {
        match self {
            Self::Status { response, .. } | Self::Decode { response, .. } => Some(*response),
            _ => None,
        }
    }

    /// Status code of the attached response, if any.
    #[must_use]
    pub fn status(&self) -> Option<http::StatusCode> {
        self.response().map(HttpResponse::status)
    }

    /// Whether the failure happened below HTTP (connect, TLS, deadline, cancel).
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Tls(_) | Self::Timeout(_) | Self::Cancelled
        )
    }
}

impl From<hyper::Error> for HttpError {
    fn from(err: hyper::Error) -> Self {
        HttpError::Transport(Box::new(err))
    }
}

impl From<hyper_util::client::legacy::Error> for HttpError {
    fn from(err: hyper_util::client::legacy::Error) -> Self {
        HttpError::Transport(Box::new(err))
    }
}
