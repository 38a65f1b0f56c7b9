//! Error types for all dynoquery operations.

use thiserror::Error;

/// Top-level error type for dynoquery operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Select(#[from] SelectError),

    #[error(transparent)]
    ParsingComplete(#[from] ParsingComplete),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("decode error: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("encode error: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("item must serialize to a JSON object")]
    NotAnObject,
}

impl Error {
    /// Returns the termination reason when this error is an expected
    /// end-of-results signal rather than a fault.
    ///
    /// Callers iterating a [`QueryParser`](crate::QueryParser) should treat
    /// `Some(_)` as "stop iterating", not as a failure to retry.
    pub fn parsing_complete(&self) -> Option<ParsingComplete> {
        match self {
            Error::ParsingComplete(reason) => Some(*reason),
            _ => None,
        }
    }
}

/// Errors recorded while accumulating a query specification.
///
/// Conflicts are detected when the offending condition is added but only
/// surface when the query is executed, so fluent chains stay infallible.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("key \"{key}\" already used in \"{condition}\" condition")]
    KeyConflict { key: String, condition: &'static str },
}

/// Errors from index selection and request compilation.
#[derive(Debug, Error)]
pub enum SelectError {
    #[error("no viable indexes found for table \"{table}\" for given query")]
    NoViableIndexes { table: String },

    /// A chosen index reached the compiler without an equals filter on its
    /// partition key. Selection guarantees the filter exists, so this is a
    /// broken invariant between selector and compiler, not a
    /// caller-reachable condition.
    #[error("no equals filter on partition key \"{key}\"")]
    MissingPartitionEquals { key: String },
}

/// Expected termination signals from a [`QueryParser`](crate::QueryParser).
///
/// Once any of these is returned, the parser is exhausted: every later
/// `next` call fails with the same reason without touching the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParsingComplete {
    #[error("all query pages have been parsed")]
    AllItemsParsed,

    #[error("max pagination has been reached")]
    MaxPaginationReached,

    #[error("no items returned from query")]
    NoItemsReturned,

    #[error("item limit has been reached")]
    LimitReached,
}

/// Errors from the backing store.
///
/// These propagate unchanged and are safe to retry: neither the metadata
/// cache nor a parser commits any state on a failed call.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {code}: {message}")]
    Store { code: String, message: String },

    #[error("protocol error: {0}")]
    Protocol(String),
}

pub type Result<T> = std::result::Result<T, Error>;
