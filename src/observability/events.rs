//! Client lifecycle events
//!
//! Events are explicit and typed; each maps to a stable uppercase name
//! and a default severity.

use std::fmt;

use super::logger::Severity;

/// Observable events in the query client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Setup
    /// Client configuration file loaded
    ConfigLoaded,
    /// Output schema file loaded
    SchemaLoaded,

    // Query
    /// Request validated and fragments dialed
    QuerySubmit,
    /// Request failed validation
    QueryRejected,
    /// Every fragment completed and all rows were returned
    QueryComplete,
    /// Query reached a terminal error
    QueryFailed,

    // Fragments
    /// Handshake and request sent on a fragment connection
    FragmentConnected,
    /// One page received from a fragment
    FragmentPage,
    /// Fragment sent BYE_
    FragmentComplete,
    /// Fragment sent ERR_ or its connection failed
    FragmentFailed,

    /// Client released its connections
    ClientClosed,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::SchemaLoaded => "SCHEMA_LOADED",
            Event::QuerySubmit => "QUERY_SUBMIT",
            Event::QueryRejected => "QUERY_REJECTED",
            Event::QueryComplete => "QUERY_COMPLETE",
            Event::QueryFailed => "QUERY_FAILED",
            Event::FragmentConnected => "FRAGMENT_CONNECTED",
            Event::FragmentPage => "FRAGMENT_PAGE",
            Event::FragmentComplete => "FRAGMENT_COMPLETE",
            Event::FragmentFailed => "FRAGMENT_FAILED",
            Event::ClientClosed => "CLIENT_CLOSED",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::FragmentPage => Severity::Trace,
            Event::QueryRejected => Severity::Warn,
            Event::QueryFailed | Event::FragmentFailed => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
