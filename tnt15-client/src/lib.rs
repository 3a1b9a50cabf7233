//! # tnt15-client
//!
//! Async TCP client for the legacy (pre-MessagePack) Tarantool binary
//! protocol.
//!
//! This crate provides:
//! - Connection management with bounded reconnect and transient-status
//!   retry loops
//! - High-level insert / select / update / delete / call operations plus
//!   `ping`
//! - Optional per-call field-type casting of result rows
//!
//! # One request in flight
//!
//! The wire format has no framing for interleaved responses and the
//! request id is never used for correlation, so a connection supports
//! exactly one request in flight at a time. This is a hard contract of
//! the protocol, not an implementation detail: every [`Connection`] and
//! [`Client`] method takes `&mut self`, and concurrent logical operations
//! require separate connections (or external serialization around one).

pub mod client;
pub mod connection;
pub mod error;

pub use client::Client;
pub use connection::{Connection, ConnectionConfig};
pub use error::ClientError;
