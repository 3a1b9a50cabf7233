//! # tnt15-protocol
//!
//! Wire protocol implementation for the legacy (pre-MessagePack) Tarantool
//! binary protocol.
//!
//! This crate provides:
//! - Base-128 varint codec for field and string lengths
//! - Length-prefixed field and tuple codecs
//! - Request builders for INSERT / SELECT / UPDATE / DELETE / CALL
//! - Response header and body decoding with optional field-type casting
//! - Protocol error types and constants
//!
//! Everything here is pure byte manipulation; socket I/O lives in
//! `tnt15-client`.

pub mod error;
pub mod field;
pub mod request;
pub mod response;
pub mod tuple;
pub mod varint;

pub use error::ProtocolError;
pub use field::{Field, FieldType};
pub use request::{Request, RequestType, UpdateOp, UpdateOpCode};
pub use response::{CompletionStatus, Response, ResponseHeader};
pub use tuple::Tuple;
pub use varint::{decode_varint, encode_varint, encode_varint_into};

/// Default port for a legacy Tarantool server.
pub const DEFAULT_PORT: u16 = 33013;

/// Size of the fixed request header in bytes (type + body length + request id).
pub const REQUEST_HEADER_SIZE: usize = 12;

/// Size of the fixed response header in bytes (request header + packed code).
pub const RESPONSE_HEADER_SIZE: usize = 16;
