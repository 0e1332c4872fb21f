//! Query client
//!
//! ```ignore
//! let mut client = KiteClient::new()
//!     .sql("select a, b from t")
//!     .schema(load_schema(Path::new("t.schema"))?)
//!     .filespec(FileSpec::Parquet)
//!     .fragments(FragmentSelector::All, 4)
//!     .hosts(vec!["10.0.0.1:7878".into()]);
//!
//! client.submit().await?;
//! while let Some(row) = client.next_row().await? {
//!     println!("{}", row);
//! }
//! client.close();
//! ```
//!
//! Rows from different fragments interleave in arrival order; rows of one
//! fragment keep the order the server sent them. One failed fragment
//! fails the whole query.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use super::config::ClientConfig;
use super::errors::{ClientError, ClientResult, ErrorKind};
use super::fragment::{open_fragment, FragmentEvent, FragmentHandle, FragmentSlot};
use super::multiplexer::Multiplexer;
use super::request::{ColumnDef, FileSpec, FragmentSelector, QueryTemplate};
use crate::observability::{log_event, ClientMetrics, Event, MetricsSnapshot};
use crate::xrg::{Row, RowIterator, XrgError};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MAX_READY_PAGES: usize = 16;

/// Query lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    /// Nothing submitted, or the last query was closed
    Idle,
    /// Requests sent, no row read yet
    Submitted,
    /// Rows are being read
    Draining,
    /// Every fragment completed and every row was returned
    Done,
    /// Terminal error; see [`KiteClient::failure`]
    Failed,
}

/// Client for one query at a time. Single consumer.
#[derive(Debug)]
pub struct KiteClient {
    template: QueryTemplate,
    connect_timeout: Duration,
    max_ready_pages: usize,

    state: QueryState,
    failure: Option<(ErrorKind, String)>,
    query_id: Option<Uuid>,
    mux: Multiplexer,
    pages: VecDeque<RowIterator>,
    current: Option<RowIterator>,
    /// Rows returned for the current query
    rows: u64,
    metrics: Arc<ClientMetrics>,
}

impl Default for KiteClient {
    fn default() -> Self {
        Self::new()
    }
}

impl KiteClient {
    pub fn new() -> Self {
        Self {
            template: QueryTemplate {
                fragment_count: 1,
                ..QueryTemplate::default()
            },
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_ready_pages: DEFAULT_MAX_READY_PAGES,
            state: QueryState::Idle,
            failure: None,
            query_id: None,
            mux: Multiplexer::new(),
            pages: VecDeque::new(),
            current: None,
            rows: 0,
            metrics: Arc::new(ClientMetrics::new()),
        }
    }

    /// Applies hosts, fragments and limits from a loaded config.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new()
            .hosts(config.hosts.clone())
            .fragments(config.selector(), config.fragment_count)
            .connect_timeout(config.connect_timeout())
            .max_ready_pages(config.max_ready_pages)
    }

    pub fn sql(mut self, sql: impl Into<String>) -> Self {
        self.template.sql = sql.into();
        self
    }

    pub fn schema(mut self, schema: Vec<ColumnDef>) -> Self {
        self.template.schema = schema;
        self
    }

    pub fn filespec(mut self, filespec: FileSpec) -> Self {
        self.template.filespec = Some(filespec);
        self
    }

    pub fn fragments(mut self, selector: FragmentSelector, count: u32) -> Self {
        self.template.selector = selector;
        self.template.fragment_count = count;
        self
    }

    pub fn hosts(mut self, hosts: Vec<String>) -> Self {
        self.template.hosts = hosts;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn max_ready_pages(mut self, pages: usize) -> Self {
        self.max_ready_pages = pages.max(1);
        self
    }

    /// Shares an existing counter set.
    pub fn with_metrics(mut self, metrics: Arc<ClientMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn state(&self) -> QueryState {
        self.state
    }

    /// Terminal error text once the query has failed.
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_ref().map(|(_, text)| text.as_str())
    }

    /// Category of the terminal error once the query has failed.
    pub fn failure_kind(&self) -> Option<ErrorKind> {
        self.failure.as_ref().map(|(kind, _)| *kind)
    }

    pub fn query_id(&self) -> Option<Uuid> {
        self.query_id
    }

    pub fn metrics(&self) -> Arc<ClientMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn fragments_info(&self) -> &[FragmentSlot] {
        self.mux.slots()
    }

    /// Validates the request, dials every fragment and sends the requests.
    ///
    /// Nothing touches the network unless validation passes. A query
    /// already in progress must be closed first.
    pub async fn submit(&mut self) -> ClientResult<()> {
        if matches!(self.state, QueryState::Submitted | QueryState::Draining) {
            return Err(ClientError::State(
                "a query is already in progress; close it first".into(),
            ));
        }

        let requests = match self.template.expand() {
            Ok(requests) => requests,
            Err(e) => {
                self.metrics.increment_queries_rejected();
                log_event(Event::QueryRejected, &[("error", e.to_string().as_str())]);
                return Err(e);
            }
        };

        self.reset();
        let query_id = Uuid::new_v4();
        let id = query_id.to_string();
        self.query_id = Some(query_id);
        self.state = QueryState::Submitted;
        self.metrics.increment_queries_submitted();
        log_event(
            Event::QuerySubmit,
            &[
                ("query_id", id.as_str()),
                ("fragments", requests.len().to_string().as_str()),
            ],
        );

        for (n, request) in requests.iter().enumerate() {
            let host = self
                .template
                .host_for(n)
                .ok_or_else(|| ClientError::Validation("no hosts configured".into()))?
                .to_string();
            let opened = match request.to_json() {
                Ok(json) => open_fragment(&host, self.connect_timeout, &json).await,
                Err(e) => Err(e),
            };
            let stream = match opened {
                Ok(stream) => stream,
                Err(e) => return Err(self.fail(e)),
            };
            let handle = self.mux.register(host.clone(), request.fragment, stream);
            self.metrics.increment_fragments_opened();
            log_event(
                Event::FragmentConnected,
                &[
                    ("query_id", id.as_str()),
                    ("fragment", fragment_label(request.fragment).as_str()),
                    ("handle", handle.index().to_string().as_str()),
                    ("host", host.as_str()),
                ],
            );
        }
        Ok(())
    }

    /// Returns the next row from any fragment, or `None` at end of stream.
    ///
    /// Blocks only while no queued page has rows left and no fragment has
    /// data ready.
    pub async fn next_row(&mut self) -> ClientResult<Option<Row>> {
        match self.state {
            QueryState::Idle => {
                return Err(ClientError::State("no query has been submitted".into()))
            }
            QueryState::Failed => {
                let (kind, message) = self
                    .failure
                    .clone()
                    .unwrap_or((ErrorKind::Server, String::new()));
                return Err(ClientError::Failed { kind, message });
            }
            QueryState::Done => return Ok(None),
            QueryState::Submitted | QueryState::Draining => {}
        }
        self.state = QueryState::Draining;

        loop {
            if let Some(iter) = self.current.as_mut() {
                let skipped_before = iter.skipped_rows();
                let advanced = iter.advance();
                let skipped = iter.skipped_rows() - skipped_before;
                if skipped > 0 {
                    self.metrics.add_invalid_rows(skipped as u64);
                }
                match advanced {
                    Ok(true) => {
                        let row = iter.current_row().map(Row::clone);
                        match row {
                            Ok(row) => {
                                self.rows += 1;
                                self.metrics.increment_rows();
                                return Ok(Some(row));
                            }
                            Err(e) => return Err(self.fail(e.into())),
                        }
                    }
                    Ok(false) => self.current = None,
                    Err(e) => return Err(self.fail(e.into())),
                }
            }

            if let Some(next) = self.pages.pop_front() {
                self.current = Some(next);
                continue;
            }

            if self.mux.is_empty() {
                self.state = QueryState::Done;
                log_event(
                    Event::QueryComplete,
                    &[
                        ("query_id", self.query_label().as_str()),
                        ("rows", self.rows.to_string().as_str()),
                    ],
                );
                return Ok(None);
            }

            self.fill_pages().await?;
        }
    }

    /// Blocks for one event, then drains ready events up to the page bound.
    async fn fill_pages(&mut self) -> ClientResult<()> {
        let Some((handle, event)) = self.mux.wait().await else {
            return Ok(());
        };
        self.handle_event(handle, event)?;
        while self.pages.len() < self.max_ready_pages {
            match self.mux.poll_ready() {
                Some((handle, event)) => self.handle_event(handle, event)?,
                None => break,
            }
        }
        Ok(())
    }

    fn handle_event(&mut self, handle: FragmentHandle, event: FragmentEvent) -> ClientResult<()> {
        let fragment = self
            .mux
            .slot(handle)
            .map(|s| fragment_label(s.fragment))
            .unwrap_or_default();
        match event {
            FragmentEvent::Page { vectors, bytes } => {
                self.metrics.add_bytes_received(bytes);
                if vectors.is_empty() {
                    return Ok(());
                }
                self.metrics.increment_pages();
                self.metrics.add_vectors(vectors.len() as u64);
                log_event(
                    Event::FragmentPage,
                    &[
                        ("query_id", self.query_label().as_str()),
                        ("fragment", fragment.as_str()),
                        ("vectors", vectors.len().to_string().as_str()),
                    ],
                );
                let columns = self.template.schema.len();
                if vectors.len() != columns {
                    return Err(self.fail(
                        XrgError::column_mismatch(format!(
                            "page has {} vectors, schema has {} columns",
                            vectors.len(),
                            columns
                        ))
                        .into(),
                    ));
                }
                match RowIterator::new(vectors) {
                    Ok(iter) => self.pages.push_back(iter),
                    Err(e) => return Err(self.fail(e.into())),
                }
                Ok(())
            }
            FragmentEvent::Complete => {
                self.metrics.increment_fragments_completed();
                log_event(
                    Event::FragmentComplete,
                    &[
                        ("query_id", self.query_label().as_str()),
                        ("fragment", fragment.as_str()),
                    ],
                );
                Ok(())
            }
            FragmentEvent::Failed(e) => {
                self.metrics.increment_fragments_failed();
                log_event(
                    Event::FragmentFailed,
                    &[
                        ("query_id", self.query_label().as_str()),
                        ("fragment", fragment.as_str()),
                        ("error", e.to_string().as_str()),
                    ],
                );
                Err(self.fail(e))
            }
        }
    }

    /// Moves to `Failed`, drops all connections and queued pages, and hands `err` back.
    fn fail(&mut self, err: ClientError) -> ClientError {
        let text = err.to_string();
        log_event(
            Event::QueryFailed,
            &[("query_id", self.query_label().as_str()), ("error", text.as_str())],
        );
        self.state = QueryState::Failed;
        self.failure = Some((err.kind(), text));
        self.mux.close();
        self.pages.clear();
        self.current = None;
        err
    }

    fn reset(&mut self) {
        self.mux.reset();
        self.pages.clear();
        self.current = None;
        self.failure = None;
        self.query_id = None;
        self.rows = 0;
    }

    /// Closes every open connection and drops queued pages.
    ///
    /// Safe to call any number of times, in any state.
    pub fn close(&mut self) {
        let open = self.mux.open_count();
        self.mux.close();
        self.pages.clear();
        self.current = None;
        if matches!(self.state, QueryState::Submitted | QueryState::Draining) {
            self.state = QueryState::Idle;
        }
        log_event(
            Event::ClientClosed,
            &[
                ("query_id", self.query_label().as_str()),
                ("open_fragments", open.to_string().as_str()),
            ],
        );
    }

    fn query_label(&self) -> String {
        self.query_id.map(|id| id.to_string()).unwrap_or_default()
    }
}

fn fragment_label(fragment: [u32; 2]) -> String {
    format!("{}/{}", fragment[0], fragment[1])
}
