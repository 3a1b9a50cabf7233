//! Protocol error types.

use thiserror::Error;

/// Errors that can occur while encoding or decoding wire data.
///
/// Construction-time validation errors (`InvalidOperationSymbol`,
/// `EmptyKeyList`, ...) are raised before any bytes are sent; decode
/// errors are fatal for the response they occur in and are never retried.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("varint not terminated within 5 bytes")]
    UnterminatedVarint,

    #[error("varint value exceeds 32 bits")]
    VarintOverflow,

    #[error("truncated field: need {needed} bytes, {available} available")]
    TruncatedField { needed: usize, available: usize },

    #[error("truncated tuple: cardinality {cardinality}, failed at field {field}")]
    TruncatedTuple { cardinality: u32, field: u32 },

    #[error("truncated response body: need {needed} bytes, {available} available")]
    TruncatedBody { needed: usize, available: usize },

    #[error("{trailing} trailing bytes after response body")]
    TrailingBytes { trailing: usize },

    #[error("short response header: expected 16 bytes, got {0}")]
    ShortHeader(usize),

    #[error("invalid completion status: {0}")]
    InvalidCompletionStatus(u8),

    #[error("integer field payload must be 4 or 8 bytes, got {0}")]
    InvalidIntWidth(usize),

    #[error("invalid update operation symbol: {0:?}")]
    InvalidOperationSymbol(char),

    #[error("select requires at least one key tuple")]
    EmptyKeyList,

    #[error("key tuple must not be empty")]
    EmptyKeyTuple,

    #[error("{0} requires at least one value")]
    EmptyArgumentList(&'static str),

    #[error("procedure name must not be empty")]
    EmptyProcName,
}
