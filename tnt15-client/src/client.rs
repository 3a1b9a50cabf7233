//! High-level client API.

use crate::connection::{Connection, ConnectionConfig};
use crate::error::ClientError;
use std::time::Duration;
use tnt15_protocol::{Field, FieldType, Request, Response, Tuple, UpdateOp};

/// High-level client for a legacy-protocol server.
///
/// Each operation builds a request, sends it through the full
/// retry/reconnect policy and returns either a fully decoded [`Response`]
/// or a typed error - never a partial result. `field_types`, when given,
/// casts each result row's fields, with the last declared type applying
/// to all trailing columns.
pub struct Client {
    conn: Connection,
}

impl Client {
    /// Creates a new client with the given configuration (not yet
    /// connected; the first operation connects lazily).
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            conn: Connection::new(config),
        }
    }

    /// Connects to the server.
    pub async fn connect(&mut self) -> Result<(), ClientError> {
        self.conn.connect().await
    }

    /// Returns whether the client is connected.
    pub fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    /// Closes the connection.
    pub async fn close(&mut self) {
        self.conn.close().await
    }

    /// The underlying connection, for callers that need the low-level
    /// send path.
    pub fn connection(&mut self) -> &mut Connection {
        &mut self.conn
    }

    async fn send(
        &mut self,
        request: Request,
        field_types: Option<&[FieldType]>,
    ) -> Result<Response, ClientError> {
        let response = self.conn.send_request(&request, field_types).await?;
        check(response)
    }

    /// Inserts a tuple into a space.
    pub async fn insert(
        &mut self,
        space_id: u32,
        values: Vec<Field>,
        return_tuple: bool,
        field_types: Option<&[FieldType]>,
    ) -> Result<Response, ClientError> {
        let request = Request::insert(space_id, values, return_tuple)?;
        self.send(request, field_types).await
    }

    /// Deletes the tuple with the given scalar key.
    pub async fn delete(
        &mut self,
        space_id: u32,
        key: impl Into<Field>,
        return_tuple: bool,
        field_types: Option<&[FieldType]>,
    ) -> Result<Response, ClientError> {
        let request = Request::delete(space_id, key, return_tuple)?;
        self.send(request, field_types).await
    }

    /// Applies update operations to the tuple with the given scalar key.
    pub async fn update(
        &mut self,
        space_id: u32,
        key: impl Into<Field>,
        ops: &[UpdateOp],
        return_tuple: bool,
        field_types: Option<&[FieldType]>,
    ) -> Result<Response, ClientError> {
        let request = Request::update(space_id, key, ops, return_tuple)?;
        self.send(request, field_types).await
    }

    /// Selects tuples matching the given keys from an index.
    pub async fn select(
        &mut self,
        space_id: u32,
        index_id: u32,
        offset: u32,
        limit: u32,
        keys: &[Tuple],
        field_types: Option<&[FieldType]>,
    ) -> Result<Response, ClientError> {
        let request = Request::select(space_id, index_id, offset, limit, keys)?;
        self.send(request, field_types).await
    }

    /// Calls a stored procedure with the given argument tuple.
    pub async fn call(
        &mut self,
        proc_name: &str,
        args: Vec<Field>,
        return_tuple: bool,
        field_types: Option<&[FieldType]>,
    ) -> Result<Response, ClientError> {
        let request = Request::call(proc_name, args, return_tuple)?;
        self.send(request, field_types).await
    }

    /// Pings the server and returns the round-trip time.
    pub async fn ping(&mut self) -> Result<Duration, ClientError> {
        self.conn.ping().await
    }
}

/// Maps a hard server failure to a typed error; transient statuses never
/// reach this point (the connection layer retries or exhausts them).
fn check(response: Response) -> Result<Response, ClientError> {
    if response.is_error() {
        return Err(ClientError::Database {
            return_code: response.return_code,
            message: response.error_message.unwrap_or_default(),
        });
    }
    Ok(response)
}
