//! Ordered, fixed-cardinality field sequences.

use crate::error::ProtocolError;
use crate::field::Field;
use bytes::BufMut;

/// A protocol tuple: the row representation.
///
/// Cardinality is written as a 32-bit little-endian count before the first
/// field and must match the number of fields exactly; decoding stops after
/// exactly that many fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tuple(pub Vec<Field>);

impl Tuple {
    pub fn new(fields: Vec<Field>) -> Self {
        Self(fields)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> &[Field] {
        &self.0
    }

    /// Appends the wire form (cardinality + fields) to `buf`.
    pub fn encode_into(&self, buf: &mut impl BufMut) {
        buf.put_u32_le(self.0.len() as u32);
        for field in &self.0 {
            field.encode_into(buf);
        }
    }

    /// Encodes into a fresh buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode_into(&mut buf);
        buf
    }

    /// Decodes one tuple from `buf` at `offset`, returning it and the new
    /// offset.
    pub fn decode(buf: &[u8], offset: usize) -> Result<(Tuple, usize), ProtocolError> {
        if offset + 4 > buf.len() {
            return Err(ProtocolError::TruncatedTuple {
                cardinality: 0,
                field: 0,
            });
        }
        let cardinality = u32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap());
        let mut pos = offset + 4;
        let mut fields = Vec::with_capacity(cardinality as usize);
        for i in 0..cardinality {
            let (field, next) = Field::decode(buf, pos).map_err(|err| match err {
                ProtocolError::TruncatedField { .. } => ProtocolError::TruncatedTuple {
                    cardinality,
                    field: i,
                },
                other => other,
            })?;
            fields.push(field);
            pos = next;
        }
        Ok((Tuple(fields), pos))
    }
}

impl From<Vec<Field>> for Tuple {
    fn from(fields: Vec<Field>) -> Self {
        Tuple(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode_layout() {
        let tuple = Tuple::new(vec![Field::U32(1), Field::from("tuple")]);
        let bytes = tuple.encode();
        // cardinality 2, field(4, 1), field(len 5, "tuple")
        assert_eq!(
            bytes,
            vec![2, 0, 0, 0, 4, 1, 0, 0, 0, 5, b't', b'u', b'p', b'l', b'e']
        );
    }

    #[test]
    fn test_decode_stops_at_cardinality() {
        let tuple = Tuple::new(vec![Field::U32(1)]);
        let mut bytes = tuple.encode();
        bytes.extend_from_slice(&[0xAA, 0xBB]); // unrelated trailing data

        let (decoded, offset) = Tuple::decode(&bytes, 0).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(offset, bytes.len() - 2);
    }

    #[test]
    fn test_truncated_tuple() {
        let tuple = Tuple::new(vec![Field::U32(1), Field::U32(2)]);
        let bytes = tuple.encode();
        let result = Tuple::decode(&bytes[..bytes.len() - 3], 0);
        assert!(matches!(
            result,
            Err(ProtocolError::TruncatedTuple {
                cardinality: 2,
                field: 1
            })
        ));
    }

    #[test]
    fn test_truncated_cardinality() {
        let result = Tuple::decode(&[1, 0], 0);
        assert!(matches!(result, Err(ProtocolError::TruncatedTuple { .. })));
    }

    fn arb_field() -> impl Strategy<Value = Field> {
        prop_oneof![
            any::<u32>().prop_map(Field::U32),
            any::<u64>().prop_map(Field::U64),
            proptest::collection::vec(any::<u8>(), 0..64).prop_map(Field::Bytes),
        ]
    }

    proptest! {
        #[test]
        fn prop_roundtrip(fields in proptest::collection::vec(arb_field(), 0..8)) {
            let tuple = Tuple::new(fields);
            let bytes = tuple.encode();
            let (decoded, offset) = Tuple::decode(&bytes, 0).unwrap();
            prop_assert_eq!(offset, bytes.len());
            prop_assert_eq!(decoded.len(), tuple.len());
            // Decoded fields are opaque bytes; compare against the raw
            // payload of each original field.
            for (raw, original) in decoded.fields().iter().zip(tuple.fields()) {
                let payload = match original {
                    Field::U32(v) => v.to_le_bytes().to_vec(),
                    Field::U64(v) => v.to_le_bytes().to_vec(),
                    Field::Bytes(b) => b.clone(),
                };
                prop_assert_eq!(raw.as_bytes().unwrap(), &payload[..]);
            }
        }
    }
}
