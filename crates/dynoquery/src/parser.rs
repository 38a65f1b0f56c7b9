//! Lazy, pull-based parsing of paginated query results.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::backend::{QueryRequest, StoreBackend};
use crate::error::{Error, ParsingComplete, Result};
use crate::query::QueryExpr;

/// Pulls typed records from a compiled query, one at a time.
///
/// The underlying query executes lazily: a backend page is fetched only
/// when a record is requested and every buffered item has already been
/// consumed. A parser is a single-owner sequence and issues at most one
/// backend fetch at a time; it is not meant to be shared between
/// concurrent callers.
///
/// The only suspension point is the backend fetch, and parser state is
/// committed only after a fetch succeeds. Cancelling a pending
/// [`next`](Self::next) (for example with `tokio::time::timeout`) or
/// observing a backend error leaves the parser where it was, so the call
/// can simply be retried.
pub struct QueryParser {
    backend: Arc<dyn StoreBackend>,
    request: QueryRequest,

    limit: Option<usize>,
    max_pagination: Option<usize>,

    last_evaluated_key: Option<Value>,
    buffer: Vec<Value>,
    cursor: usize,

    items_yielded: usize,
    pages_fetched: usize,
    all_pages_fetched: bool,

    terminal: Option<ParsingComplete>,
}

impl std::fmt::Debug for QueryParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryParser")
            .field("request", &self.request)
            .field("limit", &self.limit)
            .field("max_pagination", &self.max_pagination)
            .field("last_evaluated_key", &self.last_evaluated_key)
            .field("buffer", &self.buffer)
            .field("cursor", &self.cursor)
            .field("items_yielded", &self.items_yielded)
            .field("pages_fetched", &self.pages_fetched)
            .field("all_pages_fetched", &self.all_pages_fetched)
            .field("terminal", &self.terminal)
            .finish_non_exhaustive()
    }
}

impl QueryParser {
    pub(crate) fn new(
        backend: Arc<dyn StoreBackend>,
        request: QueryRequest,
        expr: &QueryExpr,
    ) -> Self {
        Self {
            backend,
            request,
            limit: expr.limit,
            max_pagination: expr.max_pagination,
            last_evaluated_key: None,
            buffer: Vec::new(),
            cursor: 0,
            items_yielded: 0,
            pages_fetched: 0,
            all_pages_fetched: false,
            terminal: None,
        }
    }

    /// The compiled request this parser executes.
    pub fn request(&self) -> &QueryRequest {
        &self.request
    }

    /// Number of records yielded so far.
    pub fn items_parsed(&self) -> usize {
        self.items_yielded
    }

    /// Number of backend pages fetched so far.
    pub fn pages_parsed(&self) -> usize {
        self.pages_fetched
    }

    /// Retrieve the next record from the query, decoded into `T`.
    ///
    /// Ends with a [`ParsingComplete`] reason wrapped in [`Error`] once the
    /// sequence is finished; those are stop signals, not faults. Repeated
    /// calls after a terminal condition fail with the same reason and never
    /// touch the backend. A decode failure surfaces as [`Error::Decode`]
    /// and does not disturb pagination: the following call moves on to the
    /// next record.
    pub async fn next<T: DeserializeOwned>(&mut self) -> Result<T> {
        if let Some(reason) = self.terminal {
            return Err(reason.into());
        }

        if self.cursor == self.buffer.len() {
            self.refill().await?;
        }

        let raw = std::mem::take(&mut self.buffer[self.cursor]);
        self.cursor += 1;
        self.items_yielded += 1;

        if let Some(limit) = self.limit
            && self.items_yielded == limit
        {
            // This record is still delivered; only later calls fail.
            debug!(limit, "parsing has reached the item limit");
            self.terminal = Some(ParsingComplete::LimitReached);
        }

        serde_json::from_value(raw).map_err(Error::Decode)
    }

    /// Fetch the next page into the buffer, or record why no further page
    /// will be fetched.
    async fn refill(&mut self) -> Result<()> {
        if self.all_pages_fetched {
            debug!("all pages have been parsed");
            return Err(self.finish(ParsingComplete::AllItemsParsed));
        }
        if let Some(cap) = self.max_pagination
            && self.pages_fetched == cap
        {
            debug!(cap, "max pagination has been reached");
            return Err(self.finish(ParsingComplete::MaxPaginationReached));
        }

        // A failed fetch propagates without touching parser state, so a
        // retried call re-attempts the same fetch.
        let page = self
            .backend
            .query(&self.request, self.last_evaluated_key.as_ref())
            .await?;

        if page.items.is_empty() {
            // Terminal even when a continuation token remains: a page whose
            // items were all eliminated by filter conditions ends the
            // enumeration here.
            debug!("no items returned from query");
            return Err(self.finish(ParsingComplete::NoItemsReturned));
        }

        match page.last_evaluated_key {
            Some(key) if !continuation_key_is_empty(&key) => {
                self.last_evaluated_key = Some(key);
            }
            _ => self.all_pages_fetched = true,
        }

        self.pages_fetched += 1;
        self.buffer = page.items;
        self.cursor = 0;
        Ok(())
    }

    fn finish(&mut self, reason: ParsingComplete) -> Error {
        self.terminal = Some(reason);
        reason.into()
    }
}

/// A continuation token that is absent or an empty object marks the final
/// page.
fn continuation_key_is_empty(key: &Value) -> bool {
    match key {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
