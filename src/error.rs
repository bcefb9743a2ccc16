//! Error types for documentation capture.
//!
//! Every failure in the capture pipeline surfaces as a [`DocsError`]. Nothing is
//! retried: the pipeline observes exactly one exchange, and producing wrong
//! documentation is worse than failing the test that drove it.
//!
//! # Error Categories
//!
//! | Category | Variants | Fatal |
//! |----------|----------|-------|
//! | Usage | `ReservedProperty`, `DuplicateStage`, `NotConfigured`, `UnresolvedTemplate`, `InvalidUri`, `InvalidMediaType`, `InvalidHeader` | Yes |
//! | Extraction | `NoWriter`, `NoReader`, `MissingBoundary`, `MalformedMultipart` | Yes |
//! | I/O | `Io`, `Transport`, `Json` | Propagated |
//! | External | `Snippet` | Propagated |
//!
//! # Examples
//!
//! ```
//! use restdocs_http::DocsError;
//!
//! let err = DocsError::ReservedProperty("restdocs.request-body".into());
//! assert!(err.is_usage_error());
//! assert!(err.to_string().contains("restdocs.request-body"));
//! ```

use crate::types::EntityKind;
use std::io;
use thiserror::Error;

/// Result type for documentation capture operations.
pub type Result<T> = std::result::Result<T, DocsError>;

/// Errors that can occur while capturing and converting an exchange.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DocsError {
    /// Application code tried to set one of the reserved context keys.
    #[error("Setting reserved property '{0}' is not allowed")]
    ReservedProperty(String),

    /// A built-in pipeline stage was registered twice outside the fan-out mechanism.
    #[error("Pipeline stage '{0}' is already registered")]
    DuplicateStage(String),

    /// The documentation stage ran without a configurer having initialized the context.
    #[error("Documentation requested but no configurer ran for this exchange; register documentation_configuration() first")]
    NotConfigured,

    /// A `{name}` placeholder in the target had no value at request time.
    #[error("Unresolved template variable '{0}'")]
    UnresolvedTemplate(String),

    /// The target URI could not be parsed or rebuilt.
    #[error("Invalid URI: {0}")]
    InvalidUri(String),

    /// A media type string could not be parsed.
    #[error("Invalid media type: {0}")]
    InvalidMediaType(String),

    /// A header name or value is not valid on the wire.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// No body writer is registered for the entity and media type.
    #[error("No body writer found for media type {media_type} and entity {kind:?}")]
    NoWriter {
        /// Media type the entity was to be written as
        media_type: String,
        /// Kind of entity that needed a writer
        kind: EntityKind,
    },

    /// No body reader is registered for the requested kind and media type.
    #[error("No body reader found for media type {media_type} and entity {kind:?}")]
    NoReader {
        /// Media type of the serialized bytes
        media_type: String,
        /// Kind of entity that was requested
        kind: EntityKind,
    },

    /// A multipart content type carries no boundary parameter.
    #[error("Content-Type for multipart request does not have boundary: {0}")]
    MissingBoundary(String),

    /// Multipart bytes do not follow the declared boundary framing.
    #[error("Malformed multipart body: {0}")]
    MalformedMultipart(String),

    /// I/O error while reading or writing a body stream.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The transport failed to perform the exchange.
    #[error("Transport error: {0}")]
    Transport(String),

    /// JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A snippet generator rejected the operation.
    #[error("Snippet error: {0}")]
    Snippet(String),
}

impl From<anyhow::Error> for DocsError {
    fn from(err: anyhow::Error) -> Self {
        DocsError::Snippet(format!("{:#}", err))
    }
}

impl From<reqwest::Error> for DocsError {
    fn from(err: reqwest::Error) -> Self {
        DocsError::Transport(err.to_string())
    }
}

impl From<mime::FromStrError> for DocsError {
    fn from(err: mime::FromStrError) -> Self {
        DocsError::InvalidMediaType(err.to_string())
    }
}

impl From<url::ParseError> for DocsError {
    fn from(err: url::ParseError) -> Self {
        DocsError::InvalidUri(err.to_string())
    }
}

impl DocsError {
    /// Whether the error stems from misuse of the API rather than from the exchange.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            DocsError::ReservedProperty(_)
                | DocsError::DuplicateStage(_)
                | DocsError::NotConfigured
                | DocsError::UnresolvedTemplate(_)
                | DocsError::InvalidUri(_)
                | DocsError::InvalidMediaType(_)
                | DocsError::InvalidHeader(_)
        )
    }

    /// Whether the error came from re-deriving structure out of a body.
    pub fn is_extraction_error(&self) -> bool {
        matches!(
            self,
            DocsError::NoWriter { .. }
                | DocsError::NoReader { .. }
                | DocsError::MissingBoundary(_)
                | DocsError::MalformedMultipart(_)
        )
    }
}
