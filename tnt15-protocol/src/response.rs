//! Response decoding.
//!
//! A response is one framed message: a 16-byte header
//! (`request_type:u32, body_length:u32, request_id:u32, packed_code:u32`,
//! all little-endian) followed by `body_length - 4` body bytes - the
//! protocol counts the packed code as part of the body, but it is read
//! with the header. The packed code splits into
//! `completion_status = packed & 0xFF` and `return_code = packed >> 8`.
//!
//! A non-zero return code means the body is a UTF-8 error message;
//! otherwise the body is a row set: `row_count:u32` then `row_count`
//! blocks of `{tuple_byte_size:u32}{tuple_bytes}`.

use crate::error::ProtocolError;
use crate::field::FieldType;
use crate::tuple::Tuple;
use crate::RESPONSE_HEADER_SIZE;

/// Protocol-level completion status, independent of the semantic return
/// code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStatus {
    /// Success.
    Ok,
    /// Transient server-side condition; the request may be resent as-is.
    TryAgain,
    /// Hard failure; not a retry candidate.
    Error,
}

impl CompletionStatus {
    pub fn from_u8(value: u8) -> Result<Self, ProtocolError> {
        match value {
            0 => Ok(CompletionStatus::Ok),
            1 => Ok(CompletionStatus::TryAgain),
            2 => Ok(CompletionStatus::Error),
            other => Err(ProtocolError::InvalidCompletionStatus(other)),
        }
    }
}

/// The fixed 16-byte response header.
#[derive(Debug, Clone, Copy)]
pub struct ResponseHeader {
    pub request_type: u32,
    pub body_length: u32,
    pub request_id: u32,
    pub return_code: u32,
    pub completion: CompletionStatus,
}

impl ResponseHeader {
    /// Unpacks a header from the first 16 bytes of `buf`.
    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        if buf.len() < RESPONSE_HEADER_SIZE {
            return Err(ProtocolError::ShortHeader(buf.len()));
        }
        let request_type = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        let body_length = u32::from_le_bytes(buf[4..8].try_into().unwrap());
        let request_id = u32::from_le_bytes(buf[8..12].try_into().unwrap());
        let packed_code = u32::from_le_bytes(buf[12..16].try_into().unwrap());
        Ok(Self {
            request_type,
            body_length,
            request_id,
            return_code: packed_code >> 8,
            completion: CompletionStatus::from_u8((packed_code & 0xFF) as u8)?,
        })
    }

    /// How many body bytes remain on the wire after this header.
    ///
    /// `body_length` includes the 4 packed-code bytes already consumed as
    /// part of the header; a body-less response reports 0.
    pub fn remaining_body(&self) -> usize {
        (self.body_length as usize).saturating_sub(4)
    }
}

/// A fully decoded response. Created once from the socket, immutable
/// thereafter.
#[derive(Debug, Clone)]
pub struct Response {
    pub request_type: u32,
    pub body_length: u32,
    pub request_id: u32,
    pub return_code: u32,
    pub completion: CompletionStatus,
    /// Error message, present when `return_code != 0`.
    pub error_message: Option<String>,
    /// Declared row count, present when the body was a row set.
    pub row_count: Option<u32>,
    /// Decoded rows, optionally cast per [`FieldType`].
    pub rows: Vec<Tuple>,
}

impl Response {
    /// Decodes a response from its header and the body bytes that followed
    /// it on the wire (`header.remaining_body()` of them).
    ///
    /// `field_types`, when supplied, casts each row's fields; for field
    /// index `i` past the end of the list, the last declared type repeats
    /// (the last declared type applies to all trailing columns).
    pub fn decode(
        header: ResponseHeader,
        body: &[u8],
        field_types: Option<&[FieldType]>,
    ) -> Result<Self, ProtocolError> {
        let mut response = Self {
            request_type: header.request_type,
            body_length: header.body_length,
            request_id: header.request_id,
            return_code: header.return_code,
            completion: header.completion,
            error_message: None,
            row_count: None,
            rows: Vec::new(),
        };

        // Body-less response (e.g. PING): terminal, success.
        if header.body_length == 0 {
            return Ok(response);
        }

        let expected = header.remaining_body();
        if body.len() < expected {
            return Err(ProtocolError::TruncatedBody {
                needed: expected,
                available: body.len(),
            });
        }
        let body = &body[..expected];

        if header.return_code != 0 {
            let trimmed = body.strip_suffix(&[0]).unwrap_or(body);
            response.error_message = Some(String::from_utf8_lossy(trimmed).into_owned());
            return Ok(response);
        }

        if body.len() < 4 {
            return Err(ProtocolError::TruncatedBody {
                needed: 4,
                available: body.len(),
            });
        }
        let row_count = u32::from_le_bytes(body[0..4].try_into().unwrap());
        response.row_count = Some(row_count);

        let mut pos = 4;
        for _ in 0..row_count {
            if pos + 4 > body.len() {
                return Err(ProtocolError::TruncatedBody {
                    needed: pos + 4,
                    available: body.len(),
                });
            }
            let tuple_size =
                u32::from_le_bytes(body[pos..pos + 4].try_into().unwrap()) as usize;
            pos += 4;
            if pos + tuple_size > body.len() {
                return Err(ProtocolError::TruncatedBody {
                    needed: pos + tuple_size,
                    available: body.len(),
                });
            }
            let (tuple, next) = Tuple::decode(body, pos)?;
            if next - pos != tuple_size {
                return Err(ProtocolError::TrailingBytes {
                    trailing: (pos + tuple_size).abs_diff(next),
                });
            }
            pos = next;
            response.rows.push(match field_types {
                Some(types) if !types.is_empty() => cast_tuple(&tuple, types)?,
                _ => tuple,
            });
        }
        if pos != body.len() {
            return Err(ProtocolError::TrailingBytes {
                trailing: body.len() - pos,
            });
        }

        Ok(response)
    }

    pub fn is_ok(&self) -> bool {
        self.return_code == 0
    }

    pub fn is_error(&self) -> bool {
        self.return_code != 0
    }

    /// Whether the server asked for the request to be resent.
    pub fn is_retryable(&self) -> bool {
        self.completion == CompletionStatus::TryAgain
    }

    /// Number of rows in the decoded row set.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Casts each field of `tuple` using `types`, repeating the last declared
/// type for trailing fields.
fn cast_tuple(tuple: &Tuple, types: &[FieldType]) -> Result<Tuple, ProtocolError> {
    let last = *types.last().unwrap_or(&FieldType::Any);
    let fields = tuple
        .fields()
        .iter()
        .enumerate()
        .map(|(i, field)| field.cast(*types.get(i).unwrap_or(&last)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Tuple::new(fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;
    use bytes::BufMut;

    fn pack_header(request_type: u32, body_length: u32, packed_code: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.put_u32_le(request_type);
        buf.put_u32_le(body_length);
        buf.put_u32_le(0);
        buf.put_u32_le(packed_code);
        buf
    }

    fn row_set_body(rows: &[Tuple]) -> Vec<u8> {
        let mut body = Vec::new();
        body.put_u32_le(rows.len() as u32);
        for row in rows {
            let encoded = row.encode();
            body.put_u32_le(encoded.len() as u32);
            body.extend_from_slice(&encoded);
        }
        body
    }

    #[test]
    fn test_packed_code_split() {
        let header = ResponseHeader::decode(&pack_header(13, 0, (8194 << 8) | 2)).unwrap();
        assert_eq!(header.return_code, 8194);
        assert_eq!(header.completion, CompletionStatus::Error);
    }

    #[test]
    fn test_short_header() {
        let result = ResponseHeader::decode(&[0u8; 10]);
        assert!(matches!(result, Err(ProtocolError::ShortHeader(10))));
    }

    #[test]
    fn test_invalid_completion_status() {
        let result = ResponseHeader::decode(&pack_header(13, 0, 7));
        assert!(matches!(
            result,
            Err(ProtocolError::InvalidCompletionStatus(7))
        ));
    }

    #[test]
    fn test_bodyless_response() {
        let header = ResponseHeader::decode(&pack_header(65280, 0, 0)).unwrap();
        assert_eq!(header.remaining_body(), 0);
        let response = Response::decode(header, &[], None).unwrap();
        assert!(response.is_ok());
        assert!(response.rows.is_empty());
        assert_eq!(response.row_count, None);
    }

    #[test]
    fn test_error_body() {
        // return_code 0x202C ("Duplicate key"-style), hard failure.
        let message = b"Duplicate key\0";
        let body_length = 4 + message.len() as u32;
        let header =
            ResponseHeader::decode(&pack_header(13, body_length, (0x202C << 8) | 2)).unwrap();
        let response = Response::decode(header, message, None).unwrap();

        assert!(response.is_error());
        assert!(!response.is_retryable());
        assert_eq!(response.return_code, 0x202C);
        assert_eq!(response.error_message.as_deref(), Some("Duplicate key"));
    }

    #[test]
    fn test_row_set_decoding() {
        let rows = vec![
            Tuple::new(vec![Field::U32(1), Field::from("one")]),
            Tuple::new(vec![Field::U32(2), Field::from("two")]),
        ];
        let body = row_set_body(&rows);
        let body_length = 4 + body.len() as u32;
        let header = ResponseHeader::decode(&pack_header(17, body_length, 0)).unwrap();
        let response = Response::decode(header, &body, None).unwrap();

        assert!(response.is_ok());
        assert_eq!(response.row_count, Some(2));
        assert_eq!(response.row_count(), 2);
        assert_eq!(response.rows[0].fields()[0].as_u32(), Some(1));
        assert_eq!(response.rows[1].fields()[1].as_str().unwrap(), "two");
    }

    #[test]
    fn test_response_framing_invariant() {
        // 4 + sum(4 + tuple_size) must equal body_length.
        let rows = vec![Tuple::new(vec![Field::U32(1)])];
        let body = row_set_body(&rows);
        let tuple_size = rows[0].encode().len();
        assert_eq!(4 + (4 + tuple_size), 4 + body.len());
    }

    #[test]
    fn test_truncated_row_set() {
        let rows = vec![Tuple::new(vec![Field::from("abcdef")])];
        let body = row_set_body(&rows);
        let body_length = 4 + body.len() as u32;
        let header = ResponseHeader::decode(&pack_header(17, body_length, 0)).unwrap();
        let result = Response::decode(header, &body[..body.len() - 2], None);
        assert!(matches!(result, Err(ProtocolError::TruncatedBody { .. })));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let rows = vec![Tuple::new(vec![Field::U32(1)])];
        let mut body = row_set_body(&rows);
        body.extend_from_slice(&[0xAA, 0xBB]);
        let body_length = 4 + body.len() as u32;
        let header = ResponseHeader::decode(&pack_header(17, body_length, 0)).unwrap();
        let result = Response::decode(header, &body, None);
        assert!(matches!(result, Err(ProtocolError::TrailingBytes { .. })));
    }

    #[test]
    fn test_cast_fallback_repeats_last_type() {
        // field_types = [Int, Str] over a 3-field row: the third field is
        // cast with Str.
        let rows = vec![Tuple::new(vec![
            Field::U32(7),
            Field::from("name"),
            Field::from("trailing"),
        ])];
        let body = row_set_body(&rows);
        let body_length = 4 + body.len() as u32;
        let header = ResponseHeader::decode(&pack_header(17, body_length, 0)).unwrap();
        let response =
            Response::decode(header, &body, Some(&[FieldType::Int, FieldType::Str])).unwrap();

        let fields = response.rows[0].fields();
        assert_eq!(fields[0], Field::U32(7));
        assert_eq!(fields[1].as_str().unwrap(), "name");
        assert_eq!(fields[2].as_str().unwrap(), "trailing");
    }

    #[test]
    fn test_retryable_status() {
        let header = ResponseHeader::decode(&pack_header(19, 0, 1)).unwrap();
        let response = Response::decode(header, &[], None).unwrap();
        assert!(response.is_retryable());
    }
}
