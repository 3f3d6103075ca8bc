//! Gourmet: restaurant catalog host.
//!
//! Wires the [`gourmet_query`] catalog core to a Postgres pool and serves it
//! over a newline-delimited JSON bridge on stdin/stdout.
//!
//! # Architecture
//!
//! - **Config**: TOML file plus `.env` / environment connection string
//! - **Database**: a shared `sqlx` pool behind [`gourmet_query::PgExecutor`]
//! - **Host**: versioned command envelopes, one task per request

pub mod config;
pub mod db;
pub mod error;
pub mod host;

pub use config::HostConfig;
pub use error::{HostError, Result};
