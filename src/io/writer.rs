//! Encoding context: writes markers and dispatches to serializers.

use bytes::{BufMut, BytesMut};

use crate::error::{CodecError, Result};
use super::types::serializer_for;
use super::{DataType, Value, VALUE_FLAG_NONE, VALUE_FLAG_NULL};

/// Writes values into a buffer. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryWriter;

impl BinaryWriter {
    pub fn new() -> Self {
        Self
    }

    /// Write a fully-qualified value: `[marker][value_flag][payload]`.
    pub fn write(&self, value: &Value, buf: &mut BytesMut) -> Result<()> {
        if value.is_null() {
            buf.put_u8(DataType::UnspecifiedNull.code());
            buf.put_u8(VALUE_FLAG_NULL);
            return Ok(());
        }

        buf.put_u8(value.data_type().code());
        self.write_value(value, buf, true)
    }

    /// Write a value without its marker. With `nullable` a value flag
    /// precedes the payload.
    pub fn write_value(&self, value: &Value, buf: &mut BytesMut, nullable: bool) -> Result<()> {
        if value.is_null() {
            if !nullable {
                return Err(CodecError::Encode(
                    "Null cannot be written where a value is required".to_string(),
                ));
            }
            buf.put_u8(VALUE_FLAG_NULL);
            return Ok(());
        }

        if nullable {
            buf.put_u8(VALUE_FLAG_NONE);
        }

        let data_type = value.data_type();
        serializer_for(data_type)
            .ok_or(CodecError::UnknownTypeCode(data_type.code()))?
            .write_value(value, buf, self)
    }

    /// Encode one fully-qualified value into a fresh buffer.
    pub fn to_bytes(&self, value: &Value) -> Result<BytesMut> {
        let mut buf = BytesMut::new();
        self.write(value, &mut buf)?;
        Ok(buf)
    }
}
