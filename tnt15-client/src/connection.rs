//! Connection management.
//!
//! A [`Connection`] owns one blocking point: a single TCP socket used
//! strictly sequentially (write a whole request, read a whole response).
//! Two bounded retry loops sit on top of it:
//!
//! - the inner loop resends the same request on the server's "try again"
//!   completion status, up to `retry_max_attempts` times;
//! - the outer loop reconnects and resends the whole buffer on network
//!   errors, up to `reconnect_max_attempts` times.
//!
//! No partial-write recovery is attempted; the full request buffer is
//! always rewritten from scratch.

use crate::error::ClientError;
use bytes::{BufMut, BytesMut};
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::Instant;
use tnt15_protocol::{
    FieldType, Request, RequestType, Response, ResponseHeader, REQUEST_HEADER_SIZE,
    RESPONSE_HEADER_SIZE,
};

/// Default delay between reconnect attempts.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(100);

/// Default number of reconnect attempts after a network error.
pub const DEFAULT_RECONNECT_MAX_ATTEMPTS: u32 = 10;

/// Default number of resend attempts on the "try again" status.
pub const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 10;

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Read/write timeout for socket I/O. `None` means unbounded.
    pub socket_timeout: Option<Duration>,
    /// Delay before each reconnect attempt.
    pub reconnect_delay: Duration,
    /// Reconnect budget for network errors.
    pub reconnect_max_attempts: u32,
    /// Resend budget for the "try again" completion status.
    pub retry_max_attempts: u32,
}

impl ConnectionConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            socket_timeout: None,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            reconnect_max_attempts: DEFAULT_RECONNECT_MAX_ATTEMPTS,
            retry_max_attempts: DEFAULT_RETRY_MAX_ATTEMPTS,
        }
    }

    pub fn with_socket_timeout(mut self, timeout: Duration) -> Self {
        self.socket_timeout = Some(timeout);
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_reconnect_max_attempts(mut self, attempts: u32) -> Self {
        self.reconnect_max_attempts = attempts;
        self
    }

    pub fn with_retry_max_attempts(mut self, attempts: u32) -> Self {
        self.retry_max_attempts = attempts.max(1);
        self
    }
}

/// A connection to a legacy-protocol server.
///
/// All methods take `&mut self`: the protocol supports exactly one
/// request in flight per socket (see the crate docs).
pub struct Connection {
    config: ConnectionConfig,
    stream: Option<TcpStream>,
}

impl Connection {
    /// Creates a new connection in the disconnected state.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            stream: None,
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Connects to the server, replacing (and closing) any existing
    /// socket first so repeated connects never leak a descriptor.
    ///
    /// Nagle's algorithm is disabled on the new socket; the protocol is
    /// latency-sensitive and does not batch. The socket timeout applies
    /// to subsequent reads and writes, not to the connect handshake
    /// itself.
    pub async fn connect(&mut self) -> Result<(), ClientError> {
        self.stream = None;
        let stream = TcpStream::connect((self.config.host.as_str(), self.config.port))
            .await
            .map_err(ClientError::Network)?;
        stream.set_nodelay(true).map_err(ClientError::Network)?;
        tracing::debug!(host = %self.config.host, port = self.config.port, "connected");
        self.stream = Some(stream);
        Ok(())
    }

    /// Whether a socket is currently open.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Tears the connection down explicitly.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
            tracing::debug!("connection closed");
        }
    }

    async fn ensure_connected(&mut self) -> Result<(), ClientError> {
        if self.stream.is_none() {
            self.connect().await?;
        }
        Ok(())
    }

    /// Writes the request's full byte buffer to the socket.
    async fn write_request(&mut self, request: &Request) -> Result<(), ClientError> {
        let timeout = self.config.socket_timeout;
        let stream = self.stream.as_mut().ok_or(ClientError::NotConnected)?;
        io_with_timeout(timeout, stream.write_all(request.as_bytes())).await
    }

    /// Reads exactly one framed response from the socket.
    ///
    /// A short read (including 0 bytes, meaning the peer closed) surfaces
    /// as a network error and goes through the normal reconnect policy.
    async fn read_response(
        &mut self,
        field_types: Option<&[FieldType]>,
    ) -> Result<Response, ClientError> {
        let timeout = self.config.socket_timeout;
        let stream = self.stream.as_mut().ok_or(ClientError::NotConnected)?;

        let mut header_buf = [0u8; RESPONSE_HEADER_SIZE];
        io_with_timeout(timeout, stream.read_exact(&mut header_buf)).await?;
        let header = ResponseHeader::decode(&header_buf)?;

        let mut body = vec![0u8; header.remaining_body()];
        if !body.is_empty() {
            io_with_timeout(timeout, stream.read_exact(&mut body)).await?;
        }

        Ok(Response::decode(header, &body, field_types)?)
    }

    /// Sends a request and reads its response, resending on the server's
    /// "try again" status but never reconnecting.
    ///
    /// Exhausting the resend budget while still seeing "try again" is a
    /// database error carrying the last return code and message.
    pub async fn send_request_no_reconnect(
        &mut self,
        request: &Request,
        field_types: Option<&[FieldType]>,
    ) -> Result<Response, ClientError> {
        let attempts = self.config.retry_max_attempts.max(1);
        let mut last: Option<Response> = None;

        for attempt in 1..=attempts {
            self.write_request(request).await?;
            let response = self.read_response(field_types).await?;
            if !response.is_retryable() {
                return Ok(response);
            }
            tracing::warn!(
                attempt,
                return_code = response.return_code,
                message = response.error_message.as_deref().unwrap_or(""),
                "server returned try-again status, resending"
            );
            last = Some(response);
        }

        let last = last.ok_or(ClientError::NotConnected)?;
        Err(ClientError::Database {
            return_code: last.return_code,
            message: last
                .error_message
                .unwrap_or_else(|| "retry budget exhausted".to_string()),
        })
    }

    /// Sends a request with the full retry policy: transient-status
    /// resends on the same socket, plus reconnect-and-resend on network
    /// errors. The whole request buffer is rewritten on every attempt.
    pub async fn send_request(
        &mut self,
        request: &Request,
        field_types: Option<&[FieldType]>,
    ) -> Result<Response, ClientError> {
        let mut attempts = 0u32;
        loop {
            let result = match self.ensure_connected().await {
                Ok(()) => self.send_request_no_reconnect(request, field_types).await,
                Err(err) => Err(err),
            };
            match result {
                Err(err) if err.is_retryable() => {
                    attempts += 1;
                    if attempts > self.config.reconnect_max_attempts {
                        return Err(err);
                    }
                    tracing::warn!(
                        attempt = attempts,
                        max = self.config.reconnect_max_attempts,
                        error = %err,
                        "network failure, reconnecting"
                    );
                    // Drop the broken socket; the next iteration reopens it.
                    self.stream = None;
                    tokio::time::sleep(self.config.reconnect_delay).await;
                }
                other => return other,
            }
        }
    }

    /// Sends a body-less PING frame and measures the round-trip time.
    ///
    /// Bypasses the request/response abstraction: the reply is the bare
    /// 12-byte header echoed back.
    pub async fn ping(&mut self) -> Result<Duration, ClientError> {
        self.ensure_connected().await?;
        let timeout = self.config.socket_timeout;
        let stream = self.stream.as_mut().ok_or(ClientError::NotConnected)?;

        let mut frame = BytesMut::with_capacity(REQUEST_HEADER_SIZE);
        frame.put_u32_le(RequestType::Ping as u32);
        frame.put_u32_le(0); // body length
        frame.put_u32_le(0); // request id

        let start = Instant::now();
        io_with_timeout(timeout, stream.write_all(&frame)).await?;

        let mut reply = [0u8; REQUEST_HEADER_SIZE];
        io_with_timeout(timeout, stream.read_exact(&mut reply)).await?;
        let elapsed = start.elapsed();

        let reply_type = u32::from_le_bytes(reply[..4].try_into().unwrap());
        if reply_type != RequestType::Ping as u32 {
            return Err(ClientError::UnexpectedReplyType {
                expected: RequestType::Ping as u32,
                actual: reply_type,
            });
        }
        Ok(elapsed)
    }
}

/// Runs a socket I/O future under the configured timeout. A timeout is a
/// network error like any other transport failure.
async fn io_with_timeout<T>(
    timeout: Option<Duration>,
    io: impl Future<Output = std::io::Result<T>>,
) -> Result<T, ClientError> {
    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, io).await.map_err(|_| {
            ClientError::Network(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "socket timeout",
            ))
        })?,
        None => io.await,
    };
    result.map_err(ClientError::Network)
}
