//! kite - client for fragment-parallel queries
//!
//! - `wire`: length-prefixed message envelopes over async streams
//! - `xrg`: the columnar vector codec and row iteration
//! - `client`: request building, the fragment multiplexer and the query client
//! - `observability`: structured logging and counters
//! - `cli`: the `kite` binary

pub mod cli;
pub mod client;
pub mod observability;
pub mod wire;
pub mod xrg;
