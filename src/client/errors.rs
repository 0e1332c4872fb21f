//! # Client Errors
//!
//! Error types for query submission and row retrieval.

use thiserror::Error;

use crate::wire::WireError;
use crate::xrg::XrgError;

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Error categories surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad request, nothing was sent
    Validation,
    /// Dial, read or write failure
    Connection,
    /// Malformed envelope or unexpected message
    Protocol,
    /// Corrupt vector or page
    Format,
    /// `ERR_` text from a fragment
    Server,
    /// Client used out of order, or bad configuration
    Usage,
}

/// Query client errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// Request rejected before any network activity
    #[error("invalid request: {0}")]
    Validation(String),

    /// Framing or socket failure on a fragment connection
    #[error(transparent)]
    Wire(#[from] WireError),

    /// Vector or page could not be decoded
    #[error(transparent)]
    Format(#[from] XrgError),

    /// A fragment reported an error; the text is the server's, verbatim
    #[error("{0}")]
    Server(String),

    /// Operation not allowed in the current query state
    #[error("invalid client state: {0}")]
    State(String),

    /// Configuration file could not be loaded or is invalid
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The query already failed; repeats the terminal error's kind and text
    #[error("query failed: {message}")]
    Failed { kind: ErrorKind, message: String },
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Validation(_) => ErrorKind::Validation,
            ClientError::Wire(e) if e.is_protocol() => ErrorKind::Protocol,
            ClientError::Wire(_) => ErrorKind::Connection,
            ClientError::Format(_) => ErrorKind::Format,
            ClientError::Server(_) => ErrorKind::Server,
            ClientError::Failed { kind, .. } => *kind,
            ClientError::State(_) | ClientError::Config(_) => ErrorKind::Usage,
        }
    }

    /// Server error text, for `ERR_` failures.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ClientError::Server(msg) => Some(msg),
            _ => None,
        }
    }
}
