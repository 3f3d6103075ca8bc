//! Error types for the gourmet-query crate.
//!
//! Every failure below the façade is reported as one [`QueryError`]. The
//! façade never downgrades an error into an empty result; mapping an
//! [`ErrorKind`] to a status code is the caller's job.

use std::fmt;

/// Errors that can occur while resolving, fetching, or caching a catalog query.
///
/// Payloads are plain strings so the error is `Clone`: a coalesced cache
/// fill hands the same failure to every waiting caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// Unknown source name or invalid configuration.
    #[error("config error: {0}")]
    Config(String),

    /// The query executor could not be reached.
    #[error("connection error: {0}")]
    Connection(String),

    /// The executor rejected or failed a row fetch or count fetch.
    #[error("query failed: {0}")]
    Query(String),

    /// A row did not match the expected per-source shape.
    #[error("decode failed: {0}")]
    Decode(String),

    /// The caller cancelled the request before it completed.
    #[error("query cancelled")]
    Cancelled,

    /// The shared cache could not be read or written.
    #[error("cache error: {0}")]
    Cache(String),
}

/// Stable classification of a [`QueryError`], for status-code mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Config,
    Connection,
    Query,
    Decode,
    Cancelled,
    Cache,
}

impl ErrorKind {
    /// Wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Connection => "connection",
            Self::Query => "query",
            Self::Decode => "decode",
            Self::Cancelled => "cancelled",
            Self::Cache => "cache",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl QueryError {
    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::Connection(_) => ErrorKind::Connection,
            Self::Query(_) => ErrorKind::Query,
            Self::Decode(_) => ErrorKind::Decode,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Cache(_) => ErrorKind::Cache,
        }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => Self::Connection(err.to_string()),
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::Decode(_)
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::ColumnIndexOutOfBounds { .. }
            | sqlx::Error::TypeNotFound { .. } => Self::Decode(err.to_string()),
            other => Self::Query(other.to_string()),
        }
    }
}

/// Convenience type alias for gourmet-query results.
pub type Result<T> = std::result::Result<T, QueryError>;
