//! Error types for the gourmet host.

use gourmet_query::QueryError;

/// Top-level error type for the host process.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Configuration error (missing connection string, unreadable file).
    #[error("config error: {0}")]
    Config(String),

    /// Connection pool setup error.
    #[error("database error: {0}")]
    Database(String),

    /// A command payload is missing fields or has the wrong types.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Catalog query error.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Bridge read/write or task join error.
    #[error("channel error: {0}")]
    Channel(String),
}

impl HostError {
    /// Stable, lowercase label reported to bridge clients as `error_kind`.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Database(_) => "connection",
            Self::InvalidPayload(_) => "invalid_payload",
            Self::Query(e) => e.kind().as_str(),
            Self::Io(_) | Self::Channel(_) => "channel",
        }
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, HostError>;
