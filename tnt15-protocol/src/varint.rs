//! Base-128 variable-length integer codec.
//!
//! This is the Perl `pack('w')` encoding used by the legacy protocol for
//! field and string lengths: big-endian groups of 7 bits, with the high bit
//! set on every byte except the last. It is NOT the MessagePack or protobuf
//! varint format (those are little-endian groups).

use crate::error::ProtocolError;
use bytes::BufMut;

/// Maximum encoded length of a 32-bit varint.
pub const MAX_VARINT_LEN: usize = 5;

/// Encodes `value` and appends it to `buf`.
pub fn encode_varint_into(value: u32, buf: &mut impl BufMut) {
    let mut groups = [0u8; MAX_VARINT_LEN];
    let mut n = 0;
    let mut v = value;
    loop {
        groups[n] = (v & 0x7F) as u8;
        n += 1;
        v >>= 7;
        if v == 0 {
            break;
        }
    }
    // Most significant group first, continuation bit on all but the last.
    for i in (1..n).rev() {
        buf.put_u8(groups[i] | 0x80);
    }
    buf.put_u8(groups[0]);
}

/// Encodes `value` into a fresh buffer of 1-5 bytes.
pub fn encode_varint(value: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(MAX_VARINT_LEN);
    encode_varint_into(value, &mut buf);
    buf
}

/// Decodes a varint from `buf` starting at `offset`.
///
/// Returns the value and the number of bytes consumed. Fails with
/// [`ProtocolError::UnterminatedVarint`] if no byte with a clear high bit
/// is found within 5 bytes (or before the buffer ends), and with
/// [`ProtocolError::VarintOverflow`] if the accumulated value does not fit
/// in 32 bits.
pub fn decode_varint(buf: &[u8], offset: usize) -> Result<(u32, usize), ProtocolError> {
    let mut value: u64 = 0;
    for (consumed, &byte) in buf.iter().skip(offset).take(MAX_VARINT_LEN).enumerate() {
        value = (value << 7) | u64::from(byte & 0x7F);
        if byte & 0x80 == 0 {
            if value > u64::from(u32::MAX) {
                return Err(ProtocolError::VarintOverflow);
            }
            return Ok((value as u32, consumed + 1));
        }
    }
    Err(ProtocolError::UnterminatedVarint)
}
