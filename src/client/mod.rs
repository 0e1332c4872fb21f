//! Fragment-parallel query client
//!
//! Submits one request per query fragment, fans the fragment connections
//! into a single readiness-driven multiplexer and exposes the decoded
//! pages as one pull-based row stream.
//!
//! # Lifecycle
//!
//! `Idle -> Submitted -> Draining -> Done | Failed`
//!
//! - Requests are validated before any connection is opened
//! - All connections are polled on the caller's task
//! - The first fragment error fails the whole query

mod config;
mod errors;
mod fragment;
mod kite;
mod multiplexer;
mod request;

pub use config::ClientConfig;
pub use errors::{ClientError, ClientResult, ErrorKind};
pub use fragment::{
    open_fragment, receive_page, send_request, FragmentEvent, FragmentHandle, FragmentSlot,
    FragmentState, PageOutcome,
};
pub use kite::{KiteClient, QueryState};
pub use multiplexer::Multiplexer;
pub use request::{
    load_schema, validate_schema, ColumnDef, CsvSpec, FileSpec, FragmentSelector, QueryRequest,
    QueryTemplate,
};
