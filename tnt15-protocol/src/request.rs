//! Request construction.
//!
//! Every request is serialized completely at construction time: a 12-byte
//! header (`request_type:u32, body_length:u32, request_id:u32`, all
//! little-endian) followed by a type-specific body. Once built, a request
//! is immutable and has no behavior beyond being read as bytes.
//!
//! The request id is always written as 0: the protocol is strictly
//! synchronous request/response per connection and the id is not used for
//! correlation.

use crate::error::ProtocolError;
use crate::field::Field;
use crate::tuple::Tuple;
use crate::REQUEST_HEADER_SIZE;
use bytes::{BufMut, BytesMut};

/// Request type codes. Exact values are protocol constants and must match
/// the server bit-for-bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum RequestType {
    Insert = 13,
    Select = 17,
    Update = 19,
    Delete = 20,
    Call = 22,
    Ping = 65280,
}

/// Flag set when the server should return the affected tuple(s).
const FLAG_RETURN_TUPLE: u32 = 1;

/// Update operation codes, looked up from the fixed symbol table.
///
/// The numbering is an opaque protocol contract; do not renumber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum UpdateOpCode {
    Assign = 0,
    Add = 1,
    And = 2,
    Xor = 3,
    Or = 4,
    Splice = 5,
    Delete = 6,
    Insert = 7,
    Subtract = 8,
}

impl UpdateOpCode {
    /// Looks up an operation code from its protocol symbol.
    pub fn from_symbol(symbol: char) -> Result<Self, ProtocolError> {
        match symbol {
            '=' => Ok(UpdateOpCode::Assign),
            '+' => Ok(UpdateOpCode::Add),
            '&' => Ok(UpdateOpCode::And),
            '^' => Ok(UpdateOpCode::Xor),
            '|' => Ok(UpdateOpCode::Or),
            ':' => Ok(UpdateOpCode::Splice),
            '#' => Ok(UpdateOpCode::Delete),
            '!' => Ok(UpdateOpCode::Insert),
            '-' => Ok(UpdateOpCode::Subtract),
            other => Err(ProtocolError::InvalidOperationSymbol(other)),
        }
    }
}

/// A single update operation: which field, what to do, with what argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOp {
    pub field_no: u32,
    pub op: UpdateOpCode,
    pub arg: Field,
}

impl UpdateOp {
    pub fn new(field_no: u32, op: UpdateOpCode, arg: impl Into<Field>) -> Self {
        Self {
            field_no,
            op,
            arg: arg.into(),
        }
    }

    /// Builds an operation from its protocol symbol, failing on an
    /// unrecognized one.
    pub fn from_symbol(
        field_no: u32,
        symbol: char,
        arg: impl Into<Field>,
    ) -> Result<Self, ProtocolError> {
        Ok(Self::new(field_no, UpdateOpCode::from_symbol(symbol)?, arg))
    }

    fn encode_into(&self, buf: &mut impl BufMut) {
        buf.put_u32_le(self.field_no);
        buf.put_u8(self.op as u8);
        self.arg.encode_into(buf);
    }
}

/// A fully serialized request, ready to be written to the socket.
#[derive(Debug, Clone)]
pub struct Request {
    request_type: RequestType,
    bytes: BytesMut,
}

impl Request {
    fn from_body(request_type: RequestType, body: &[u8]) -> Self {
        let mut bytes = BytesMut::with_capacity(REQUEST_HEADER_SIZE + body.len());
        bytes.put_u32_le(request_type as u32);
        bytes.put_u32_le(body.len() as u32);
        bytes.put_u32_le(0); // request id, reserved
        bytes.put_slice(body);
        Self {
            request_type,
            bytes,
        }
    }

    /// INSERT: `space_id, flags, tuple(values)`.
    pub fn insert(
        space_id: u32,
        values: Vec<Field>,
        return_tuple: bool,
    ) -> Result<Self, ProtocolError> {
        if values.is_empty() {
            return Err(ProtocolError::EmptyArgumentList("insert"));
        }
        let mut body = BytesMut::new();
        body.put_u32_le(space_id);
        body.put_u32_le(flags(return_tuple));
        Tuple::new(values).encode_into(&mut body);
        Ok(Self::from_body(RequestType::Insert, &body))
    }

    /// DELETE: `space_id, flags, tuple(key as 1-tuple)`.
    ///
    /// The key is a scalar by construction; it is wrapped in a 1-tuple on
    /// the wire.
    pub fn delete(
        space_id: u32,
        key: impl Into<Field>,
        return_tuple: bool,
    ) -> Result<Self, ProtocolError> {
        let mut body = BytesMut::new();
        body.put_u32_le(space_id);
        body.put_u32_le(flags(return_tuple));
        Tuple::new(vec![key.into()]).encode_into(&mut body);
        Ok(Self::from_body(RequestType::Delete, &body))
    }

    /// SELECT: `space_id, index_id, offset, limit, key_count, tuple+`.
    ///
    /// Requires a non-empty list of key tuples, each itself non-empty.
    pub fn select(
        space_id: u32,
        index_id: u32,
        offset: u32,
        limit: u32,
        keys: &[Tuple],
    ) -> Result<Self, ProtocolError> {
        if keys.is_empty() {
            return Err(ProtocolError::EmptyKeyList);
        }
        if keys.iter().any(Tuple::is_empty) {
            return Err(ProtocolError::EmptyKeyTuple);
        }
        let mut body = BytesMut::new();
        body.put_u32_le(space_id);
        body.put_u32_le(index_id);
        body.put_u32_le(offset);
        body.put_u32_le(limit);
        body.put_u32_le(keys.len() as u32);
        for key in keys {
            key.encode_into(&mut body);
        }
        Ok(Self::from_body(RequestType::Select, &body))
    }

    /// UPDATE: `space_id, flags, tuple(key as 1-tuple), op_count, op+`.
    ///
    /// The key is a scalar, never a tuple; each operation is
    /// `field_no:u32, op_code:u8, arg:field`.
    pub fn update(
        space_id: u32,
        key: impl Into<Field>,
        ops: &[UpdateOp],
        return_tuple: bool,
    ) -> Result<Self, ProtocolError> {
        if ops.is_empty() {
            return Err(ProtocolError::EmptyArgumentList("update"));
        }
        let mut body = BytesMut::new();
        body.put_u32_le(space_id);
        body.put_u32_le(flags(return_tuple));
        Tuple::new(vec![key.into()]).encode_into(&mut body);
        body.put_u32_le(ops.len() as u32);
        for op in ops {
            op.encode_into(&mut body);
        }
        Ok(Self::from_body(RequestType::Update, &body))
    }

    /// CALL: `flags, field(proc_name), tuple(args)`.
    ///
    /// An empty argument tuple is legal (zero-argument procedures); an
    /// empty procedure name is not.
    pub fn call(
        proc_name: &str,
        args: Vec<Field>,
        return_tuple: bool,
    ) -> Result<Self, ProtocolError> {
        if proc_name.is_empty() {
            return Err(ProtocolError::EmptyProcName);
        }
        let mut body = BytesMut::new();
        body.put_u32_le(flags(return_tuple));
        Field::from(proc_name).encode_into(&mut body);
        Tuple::new(args).encode_into(&mut body);
        Ok(Self::from_body(RequestType::Call, &body))
    }

    /// The request type this buffer carries.
    pub fn request_type(&self) -> RequestType {
        self.request_type
    }

    /// The full wire buffer: 12-byte header plus body.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The serialized body, without the header.
    pub fn body(&self) -> &[u8] {
        &self.bytes[REQUEST_HEADER_SIZE..]
    }
}

fn flags(return_tuple: bool) -> u32 {
    if return_tuple {
        FLAG_RETURN_TUPLE
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_of(request: &Request) -> (u32, u32, u32) {
        let bytes = request.as_bytes();
        (
            u32::from_le_bytes(bytes[0..4].try_into().unwrap()),
            u32::from_le_bytes(bytes[4..8].try_into().unwrap()),
            u32::from_le_bytes(bytes[8..12].try_into().unwrap()),
        )
    }

    #[test]
    fn test_insert_wire_layout() {
        // Insert into space 0, values (1, "tuple"), return_tuple = false.
        let request =
            Request::insert(0, vec![Field::U32(1), Field::from("tuple")], false).unwrap();

        let (request_type, body_length, request_id) = header_of(&request);
        assert_eq!(request_type, 13);
        assert_eq!(body_length as usize, request.body().len());
        assert_eq!(request_id, 0);

        let expected_body: Vec<u8> = [
            &[0, 0, 0, 0][..],              // space_id = 0
            &[0, 0, 0, 0][..],              // flags = 0
            &[2, 0, 0, 0][..],              // cardinality = 2
            &[4, 1, 0, 0, 0][..],           // field(4, 1)
            &[5, b't', b'u', b'p', b'l', b'e'][..], // field(len 5, "tuple")
        ]
        .concat();
        assert_eq!(request.body(), &expected_body[..]);
    }

    #[test]
    fn test_select_wire_layout() {
        // Select space 0, index 0, key [1], offset 0, limit 1.
        let key = Tuple::new(vec![Field::U32(1)]);
        let request = Request::select(0, 0, 0, 1, &[key]).unwrap();

        let (request_type, body_length, _) = header_of(&request);
        assert_eq!(request_type, 17);
        assert_eq!(body_length as usize, request.body().len());

        let expected_body: Vec<u8> = [
            &[0, 0, 0, 0][..],    // space_id
            &[0, 0, 0, 0][..],    // index_id
            &[0, 0, 0, 0][..],    // offset
            &[1, 0, 0, 0][..],    // limit
            &[1, 0, 0, 0][..],    // key tuple count
            &[1, 0, 0, 0][..],    // key cardinality
            &[4, 1, 0, 0, 0][..], // field(4, 1)
        ]
        .concat();
        assert_eq!(request.body(), &expected_body[..]);
    }

    #[test]
    fn test_update_wire_layout() {
        let op = UpdateOp::from_symbol(1, '+', Field::U32(5)).unwrap();
        let request = Request::update(2, Field::U32(9), &[op], true).unwrap();

        let (request_type, body_length, _) = header_of(&request);
        assert_eq!(request_type, 19);
        assert_eq!(body_length as usize, request.body().len());

        let expected_body: Vec<u8> = [
            &[2, 0, 0, 0][..],    // space_id
            &[1, 0, 0, 0][..],    // flags = return_tuple
            &[1, 0, 0, 0][..],    // key cardinality
            &[4, 9, 0, 0, 0][..], // key field
            &[1, 0, 0, 0][..],    // op count
            &[1, 0, 0, 0][..],    // field_no
            &[1][..],             // op code: add
            &[4, 5, 0, 0, 0][..], // arg
        ]
        .concat();
        assert_eq!(request.body(), &expected_body[..]);
    }

    #[test]
    fn test_call_wire_layout() {
        let request = Request::call("box.time", vec![], false).unwrap();

        let (request_type, body_length, _) = header_of(&request);
        assert_eq!(request_type, 22);
        assert_eq!(body_length as usize, request.body().len());

        let expected_body: Vec<u8> = [
            &[0, 0, 0, 0][..], // flags
            &[8][..],          // proc name length
            b"box.time",
            &[0, 0, 0, 0][..], // empty args tuple
        ]
        .concat();
        assert_eq!(request.body(), &expected_body[..]);
    }

    #[test]
    fn test_delete_wraps_key() {
        let request = Request::delete(1, Field::U32(3), false).unwrap();
        let (request_type, body_length, _) = header_of(&request);
        assert_eq!(request_type, 20);
        assert_eq!(body_length as usize, request.body().len());
        // space, flags, then a 1-tuple with the key.
        assert_eq!(&request.body()[8..12], &[1, 0, 0, 0]);
    }

    #[test]
    fn test_construction_validation() {
        assert!(matches!(
            Request::insert(0, vec![], false),
            Err(ProtocolError::EmptyArgumentList("insert"))
        ));
        assert!(matches!(
            Request::select(0, 0, 0, 1, &[]),
            Err(ProtocolError::EmptyKeyList)
        ));
        assert!(matches!(
            Request::select(0, 0, 0, 1, &[Tuple::default()]),
            Err(ProtocolError::EmptyKeyTuple)
        ));
        assert!(matches!(
            Request::update(0, Field::U32(1), &[], false),
            Err(ProtocolError::EmptyArgumentList("update"))
        ));
        assert!(matches!(
            Request::call("", vec![], false),
            Err(ProtocolError::EmptyProcName)
        ));
    }

    #[test]
    fn test_invalid_symbol_rejected() {
        let result = UpdateOpCode::from_symbol('?');
        assert!(matches!(
            result,
            Err(ProtocolError::InvalidOperationSymbol('?'))
        ));
    }

    #[test]
    fn test_symbol_table() {
        let table = [
            ('=', UpdateOpCode::Assign),
            ('+', UpdateOpCode::Add),
            ('&', UpdateOpCode::And),
            ('^', UpdateOpCode::Xor),
            ('|', UpdateOpCode::Or),
            (':', UpdateOpCode::Splice),
            ('#', UpdateOpCode::Delete),
            ('!', UpdateOpCode::Insert),
            ('-', UpdateOpCode::Subtract),
        ];
        for (symbol, code) in table {
            assert_eq!(UpdateOpCode::from_symbol(symbol).unwrap(), code);
        }
    }

    #[test]
    fn test_total_length_is_header_plus_body() {
        let request = Request::insert(5, vec![Field::U32(1)], true).unwrap();
        let (_, body_length, _) = header_of(&request);
        assert_eq!(request.as_bytes().len(), 12 + body_length as usize);
    }
}
