//! Client error types.

use thiserror::Error;
use tnt15_protocol::ProtocolError;

/// Client errors.
///
/// Network errors are retried by reconnecting, up to the configured
/// limit; database and protocol errors are surfaced immediately (retrying
/// a malformed stream cannot help).
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("network error: {} ({0})", errno_text(.0.kind()))]
    Network(#[source] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("not connected")]
    NotConnected,

    #[error("server error {return_code}: {message}")]
    Database { return_code: u32, message: String },

    #[error("unexpected reply type: expected {expected}, got {actual}")]
    UnexpectedReplyType { expected: u32, actual: u32 },
}

impl ClientError {
    /// Whether this error is recoverable by reconnecting and resending.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Network(_))
    }
}

/// Platform-independent text for socket error kinds, consulted only when
/// formatting a network error for humans. A fixed table, no global state.
fn errno_text(kind: std::io::ErrorKind) -> &'static str {
    use std::io::ErrorKind;
    match kind {
        ErrorKind::ConnectionRefused => "connection refused",
        ErrorKind::ConnectionReset => "connection reset by peer",
        ErrorKind::ConnectionAborted => "connection aborted",
        ErrorKind::NotConnected => "socket not connected",
        ErrorKind::BrokenPipe => "broken pipe",
        ErrorKind::AddrInUse => "address already in use",
        ErrorKind::AddrNotAvailable => "address not available",
        ErrorKind::TimedOut => "operation timed out",
        ErrorKind::UnexpectedEof => "peer closed the connection",
        _ => "i/o failure",
    }
}
