//! Decoding context: reads markers and dispatches to serializers.

use std::sync::Arc;

use bytes::Buf;

use crate::error::{CodecError, Result};
use super::buffer::read_u8;
use super::types::serializer_for;
use super::{DataType, TypeRegistry, Value, VALUE_FLAG_NONE, VALUE_FLAG_NULL};

/// Deepest container nesting accepted while decoding one value.
pub const MAX_NESTING_DEPTH: usize = 256;

/// Reads values from a buffer.
///
/// Holds the type registry used to resolve CLASS descriptors and the current
/// container nesting depth. Cheap to clone.
#[derive(Debug, Clone)]
pub struct BinaryReader {
    types: Arc<TypeRegistry>,
    depth: usize,
}

impl BinaryReader {
    /// Reader resolving class names against the standard registry.
    pub fn new() -> Self {
        Self::with_types(TypeRegistry::standard())
    }

    pub fn with_types(types: Arc<TypeRegistry>) -> Self {
        Self { types, depth: 0 }
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Read a fully-qualified value: `[marker][value_flag][payload]`.
    pub fn read(&self, buf: &mut dyn Buf) -> Result<Value> {
        let data_type = DataType::from_code(read_u8(buf)?)?;

        if data_type == DataType::UnspecifiedNull {
            return match read_u8(buf)? {
                VALUE_FLAG_NULL => Ok(Value::Null),
                flag => Err(CodecError::Decode(format!(
                    "Unspecified null must carry the null flag, got 0x{:02x}",
                    flag
                ))),
            };
        }

        self.read_value(buf, data_type, true)
    }

    /// Read a value whose marker is known from context.
    ///
    /// When `nullable` is set the payload is preceded by a value flag.
    pub fn read_value(&self, buf: &mut dyn Buf, data_type: DataType, nullable: bool) -> Result<Value> {
        if nullable {
            match read_u8(buf)? {
                VALUE_FLAG_NONE => {}
                VALUE_FLAG_NULL => return Ok(Value::Null),
                flag => {
                    return Err(CodecError::Decode(format!("Invalid value flag 0x{:02x}", flag)))
                }
            }
        }

        let serializer = serializer_for(data_type).ok_or(CodecError::UnknownTypeCode(data_type.code()))?;
        if nests(data_type) {
            serializer.read_value(buf, &self.descend()?)
        } else {
            serializer.read_value(buf, self)
        }
    }

    /// Reader for the children of a container one level down.
    fn descend(&self) -> Result<Self> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(CodecError::Decode("Maximum nesting depth exceeded".to_string()));
        }
        Ok(Self { types: Arc::clone(&self.types), depth: self.depth + 1 })
    }
}

/// Types whose payload carries further fully-qualified values.
fn nests(data_type: DataType) -> bool {
    matches!(
        data_type,
        DataType::List | DataType::Set | DataType::Map | DataType::Metrics | DataType::Bytecode
    )
}

impl Default for BinaryReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_unspecified_null() {
        let mut buf: &[u8] = &[0xfe, 0x01];
        assert_eq!(BinaryReader::new().read(&mut buf).unwrap(), Value::Null);
    }

    #[test]
    fn test_read_null_flag_for_typed_value() {
        let mut buf: &[u8] = &[0x03, 0x01];
        assert_eq!(BinaryReader::new().read(&mut buf).unwrap(), Value::Null);
    }

    #[test]
    fn test_unknown_marker() {
        let mut buf: &[u8] = &[0x77, 0x00];
        assert_eq!(
            BinaryReader::new().read(&mut buf),
            Err(CodecError::UnknownTypeCode(0x77))
        );
    }

    #[test]
    fn test_bad_value_flag() {
        let mut buf: &[u8] = &[0x01, 0x05, 0, 0, 0, 1];
        assert!(matches!(BinaryReader::new().read(&mut buf), Err(CodecError::Decode(_))));
    }

    /// `depth` LIST headers each holding one item, closed by a null.
    fn nested_lists(depth: usize) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(depth * 6 + 2);
        for _ in 0..depth {
            bytes.extend_from_slice(&[0x09, 0x00, 0, 0, 0, 1]);
        }
        bytes.extend_from_slice(&[0xfe, 0x01]);
        bytes
    }

    #[test]
    fn test_deep_nesting_is_decode_error() {
        let bytes = nested_lists(100_000);
        let result = BinaryReader::new().read(&mut &bytes[..]);
        assert_eq!(
            result,
            Err(CodecError::Decode("Maximum nesting depth exceeded".to_string()))
        );
    }

    #[test]
    fn test_nesting_at_limit_decodes() {
        let bytes = nested_lists(MAX_NESTING_DEPTH);
        let mut value = BinaryReader::new().read(&mut &bytes[..]).unwrap();
        for _ in 0..MAX_NESTING_DEPTH {
            value = match value {
                Value::List(mut items) => items.pop().unwrap(),
                other => panic!("expected list, got {:?}", other),
            };
        }
        assert_eq!(value, Value::Null);
        assert!(BinaryReader::new().read(&mut &nested_lists(MAX_NESTING_DEPTH + 1)[..]).is_err());
    }

    #[test]
    fn test_deep_map_nesting_is_decode_error() {
        let mut bytes = Vec::new();
        for _ in 0..10_000 {
            // map with one entry: key null, value continues the chain
            bytes.extend_from_slice(&[0x0a, 0x00, 0, 0, 0, 1, 0xfe, 0x01]);
        }
        bytes.extend_from_slice(&[0xfe, 0x01]);
        assert!(matches!(
            BinaryReader::new().read(&mut &bytes[..]),
            Err(CodecError::Decode(_))
        ));
    }

    #[test]
    fn test_empty_buffer_underflows() {
        let mut buf: &[u8] = &[];
        assert!(matches!(
            BinaryReader::new().read(&mut buf),
            Err(CodecError::BufferUnderflow { needed: 1, remaining: 0 })
        ));
    }
}
