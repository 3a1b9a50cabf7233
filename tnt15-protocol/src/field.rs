//! Scalar field values and their length-prefixed wire codec.

use crate::error::ProtocolError;
use crate::varint::{decode_varint, encode_varint_into};
use bytes::BufMut;
use std::borrow::Cow;

/// A scalar value as the protocol understands it.
///
/// Integers travel as 4- or 8-byte little-endian payloads; the variant
/// picks the on-wire width. Everything textual or binary is `Bytes` - the
/// protocol never assumes an encoding. There is no implicit
/// stringification: anything else must be converted explicitly by the
/// caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    U32(u32),
    U64(u64),
    Bytes(Vec<u8>),
}

impl Field {
    /// Encodes an integer with its 1-byte length prefix (4 or 8).
    ///
    /// Values above `u32::MAX` get the 8-byte form; smaller values the
    /// 4-byte form. Used by the `From<u64>` constructor to pick the
    /// narrowest width.
    pub fn from_int(value: u64) -> Self {
        match u32::try_from(value) {
            Ok(v) => Field::U32(v),
            Err(_) => Field::U64(value),
        }
    }

    /// Appends the field's wire form (length prefix + payload) to `buf`.
    pub fn encode_into(&self, buf: &mut impl BufMut) {
        match self {
            Field::U32(v) => {
                buf.put_u8(4);
                buf.put_u32_le(*v);
            }
            Field::U64(v) => {
                buf.put_u8(8);
                buf.put_u64_le(*v);
            }
            Field::Bytes(b) => {
                encode_varint_into(b.len() as u32, buf);
                buf.put_slice(b);
            }
        }
    }

    /// Decodes one field from `buf` at `offset`.
    ///
    /// The result is always an opaque `Field::Bytes`; deciding whether the
    /// payload was an integer is a separate, explicit cast (see
    /// [`Field::cast`]). Returns the field and the new offset.
    pub fn decode(buf: &[u8], offset: usize) -> Result<(Field, usize), ProtocolError> {
        let (len, consumed) = decode_varint(buf, offset)?;
        let start = offset + consumed;
        let end = start + len as usize;
        if end > buf.len() {
            return Err(ProtocolError::TruncatedField {
                needed: len as usize,
                available: buf.len() - start,
            });
        }
        Ok((Field::Bytes(buf[start..end].to_vec()), end))
    }

    /// Reinterprets a raw field as the requested type.
    ///
    /// Integer casting relies on the protocol invariant that integer
    /// payloads are exactly 4 or 8 bytes; any other width is a format
    /// error, never a silent truncation. String casting is lossy UTF-8
    /// (invalid sequences become replacement characters). `Any` is the
    /// identity.
    pub fn cast(&self, ty: FieldType) -> Result<Field, ProtocolError> {
        match ty {
            FieldType::Any => Ok(self.clone()),
            FieldType::Int => match self {
                Field::U32(_) | Field::U64(_) => Ok(self.clone()),
                Field::Bytes(b) => match b.len() {
                    4 => Ok(Field::U32(u32::from_le_bytes(b[..].try_into().unwrap()))),
                    8 => Ok(Field::U64(u64::from_le_bytes(b[..].try_into().unwrap()))),
                    n => Err(ProtocolError::InvalidIntWidth(n)),
                },
            },
            FieldType::Str => match self {
                Field::Bytes(b) => {
                    let text = String::from_utf8_lossy(b);
                    Ok(Field::Bytes(text.into_owned().into_bytes()))
                }
                other => Ok(other.clone()),
            },
        }
    }

    /// The integer value, if this field is (or holds) a 32-bit integer.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Field::U32(v) => Some(*v),
            Field::U64(v) => u32::try_from(*v).ok(),
            Field::Bytes(b) if b.len() == 4 => {
                Some(u32::from_le_bytes(b[..].try_into().unwrap()))
            }
            Field::Bytes(_) => None,
        }
    }

    /// The integer value, widened to 64 bits where possible.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Field::U32(v) => Some(u64::from(*v)),
            Field::U64(v) => Some(*v),
            Field::Bytes(b) if b.len() == 4 => {
                Some(u64::from(u32::from_le_bytes(b[..].try_into().unwrap())))
            }
            Field::Bytes(b) if b.len() == 8 => {
                Some(u64::from_le_bytes(b[..].try_into().unwrap()))
            }
            Field::Bytes(_) => None,
        }
    }

    /// The raw payload bytes, if this field holds bytes.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Field::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// A lossy text view of a byte field.
    pub fn as_str(&self) -> Option<Cow<'_, str>> {
        match self {
            Field::Bytes(b) => Some(String::from_utf8_lossy(b)),
            _ => None,
        }
    }
}

impl From<u32> for Field {
    fn from(value: u32) -> Self {
        Field::U32(value)
    }
}

impl From<u64> for Field {
    fn from(value: u64) -> Self {
        Field::from_int(value)
    }
}

impl From<&str> for Field {
    fn from(value: &str) -> Self {
        Field::Bytes(value.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for Field {
    fn from(value: Vec<u8>) -> Self {
        Field::Bytes(value)
    }
}

impl From<&[u8]> for Field {
    fn from(value: &[u8]) -> Self {
        Field::Bytes(value.to_vec())
    }
}

/// Requested result type for per-field casting of decoded rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Keep the raw bytes.
    Any,
    /// 4-byte payload becomes `U32`, 8-byte payload becomes `U64`.
    Int,
    /// Lossy UTF-8 normalization of the payload.
    Str,
}
