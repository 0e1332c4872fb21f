//! Wire framing error types
//!
//! Error codes:
//! - KITE_WIRE_CONNECTION (FATAL severity): the socket failed
//! - KITE_WIRE_PROTOCOL (FATAL severity): the peer sent a malformed envelope
//!
//! Both terminate the connection they occurred on.

use std::fmt;
use std::io;

/// Wire error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireErrorCode {
    /// Dial, read or write failure, including a peer closing mid-message
    KiteWireConnection,
    /// Non-hex length, unknown tag, oversized payload
    KiteWireProtocol,
}

impl WireErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            WireErrorCode::KiteWireConnection => "KITE_WIRE_CONNECTION",
            WireErrorCode::KiteWireProtocol => "KITE_WIRE_PROTOCOL",
        }
    }
}

impl fmt::Display for WireErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Framing error with context
#[derive(Debug)]
pub struct WireError {
    code: WireErrorCode,
    message: String,
    source: Option<io::Error>,
}

impl WireError {
    /// I/O failure on the underlying stream
    pub fn connection(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: WireErrorCode::KiteWireConnection,
            message: message.into(),
            source: Some(source),
        }
    }

    /// Connection-level failure without an I/O error, e.g. a timeout
    pub fn connection_msg(message: impl Into<String>) -> Self {
        Self {
            code: WireErrorCode::KiteWireConnection,
            message: message.into(),
            source: None,
        }
    }

    /// The peer violated the envelope format
    pub fn protocol(message: impl Into<String>) -> Self {
        Self {
            code: WireErrorCode::KiteWireProtocol,
            message: message.into(),
            source: None,
        }
    }

    pub fn code(&self) -> WireErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_connection(&self) -> bool {
        self.code == WireErrorCode::KiteWireConnection
    }

    pub fn is_protocol(&self) -> bool {
        self.code == WireErrorCode::KiteWireProtocol
    }

    /// Wire errors always end the connection
    pub fn is_fatal(&self) -> bool {
        true
    }
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[FATAL] {}: {}", self.code, self.message)?;
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for WireError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for wire operations
pub type WireResult<T> = Result<T, WireError>;
