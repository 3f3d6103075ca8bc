//! Host-facing command contract, routing, and the stdio JSON bridge.

pub mod contract;
pub mod handler;
pub mod stdio;
