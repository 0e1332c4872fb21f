//! XRG codec error types
//!
//! Error codes:
//! - KITE_XRG_CORRUPTION (FATAL severity)
//! - KITE_XRG_UNSUPPORTED_TYPE (FATAL severity)
//! - KITE_XRG_ARRAY_DIMENSION (FATAL severity)
//! - KITE_XRG_ITERATOR_STATE (ERROR severity)
//!
//! Every decode failure is fatal for the query: partial columnar state
//! cannot be trusted once one vector is found corrupt.

use std::fmt;
use std::io;

/// Severity levels for codec errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Caller misuse, the data itself is fine
    Error,
    /// The data stream cannot be trusted any more
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// XRG-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrgErrorCode {
    /// Bad magic, truncated buffer, length or decompression mismatch
    KiteXrgCorruption,
    /// Physical/logical type code the decoder does not handle
    KiteXrgUnsupportedType,
    /// Array with more than one dimension, or nested arrays
    KiteXrgArrayDimension,
    /// Row iterator used out of order
    KiteXrgIteratorState,
}

impl XrgErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            XrgErrorCode::KiteXrgCorruption => "KITE_XRG_CORRUPTION",
            XrgErrorCode::KiteXrgUnsupportedType => "KITE_XRG_UNSUPPORTED_TYPE",
            XrgErrorCode::KiteXrgArrayDimension => "KITE_XRG_ARRAY_DIMENSION",
            XrgErrorCode::KiteXrgIteratorState => "KITE_XRG_ITERATOR_STATE",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            XrgErrorCode::KiteXrgIteratorState => Severity::Error,
            _ => Severity::Fatal,
        }
    }
}

impl fmt::Display for XrgErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Codec error with context
#[derive(Debug)]
pub struct XrgError {
    code: XrgErrorCode,
    message: String,
    details: Option<String>,
    source: Option<io::Error>,
}

impl XrgError {
    fn new(code: XrgErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Generic corruption of a vector or container buffer
    pub fn corruption(message: impl Into<String>) -> Self {
        Self::new(XrgErrorCode::KiteXrgCorruption, message)
    }

    /// The magic tag did not read `XRG1`
    pub fn bad_magic(found: &[u8]) -> Self {
        Self::new(XrgErrorCode::KiteXrgCorruption, "bad magic")
            .with_details(format!("found: {:?}", String::from_utf8_lossy(found)))
    }

    /// A read ran past the end of its buffer
    pub fn truncated(what: &str, needed: usize, available: usize) -> Self {
        Self::new(
            XrgErrorCode::KiteXrgCorruption,
            format!("truncated {}", what),
        )
        .with_details(format!("needed: {}, available: {}", needed, available))
    }

    /// The block decompressor failed or produced the wrong size
    pub fn decompress_failed(expected: usize, reason: impl Into<String>) -> Self {
        Self::new(XrgErrorCode::KiteXrgCorruption, reason)
            .with_details(format!("expected_bytes: {}", expected))
    }

    /// Unknown or unsupported physical/logical type code
    pub fn unsupported_type(message: impl Into<String>) -> Self {
        Self::new(XrgErrorCode::KiteXrgUnsupportedType, message)
    }

    /// Array that is not one-dimensional
    pub fn not_one_dim(ndim: i32) -> Self {
        Self::new(XrgErrorCode::KiteXrgArrayDimension, "array is not 1-D")
            .with_details(format!("ndim: {}", ndim))
    }

    /// Array element that is itself an array
    pub fn nested_array() -> Self {
        Self::new(XrgErrorCode::KiteXrgArrayDimension, "array is not 1-D")
            .with_details("nested array element".to_string())
    }

    /// Vectors of one page disagree on shape
    pub fn column_mismatch(message: impl Into<String>) -> Self {
        Self::new(XrgErrorCode::KiteXrgCorruption, message)
    }

    /// Row access outside of a successful advance
    pub fn iterator_state(message: impl Into<String>) -> Self {
        Self::new(XrgErrorCode::KiteXrgIteratorState, message)
    }

    /// Failure reading a container file from disk
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: XrgErrorCode::KiteXrgCorruption,
            message: message.into(),
            details: None,
            source: Some(source),
        }
    }

    fn with_details(mut self, details: String) -> Self {
        self.details = Some(details);
        self
    }

    /// Returns the error code
    pub fn code(&self) -> XrgErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns additional error details
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Returns whether the error poisons the whole query
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for XrgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for XrgError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for codec operations
pub type XrgResult<T> = Result<T, XrgError>;
