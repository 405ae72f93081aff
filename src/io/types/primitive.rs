//! Fixed-width scalars: INT, LONG, SHORT, BYTE, DOUBLE, FLOAT, BOOLEAN, UUID.
//!
//! All integers and floats are big-endian. BOOLEAN is one byte, `0x01` for
//! true. UUID is 16 bytes, most-significant half first.

use bytes::{Buf, BufMut, BytesMut};
use uuid::Uuid;

use crate::error::{CodecError, Result};
use crate::io::buffer::{read_f32, read_f64, read_i16, read_i32, read_i64, read_i8, read_u128, read_u8};
use crate::io::{BinaryReader, BinaryWriter, DataType, Value};
use super::TypeSerializer;

pub struct IntSerializer;
pub struct LongSerializer;
pub struct ShortSerializer;
pub struct ByteSerializer;
pub struct DoubleSerializer;
pub struct FloatSerializer;
pub struct BooleanSerializer;
pub struct UuidSerializer;

impl TypeSerializer for IntSerializer {
    fn data_type(&self) -> DataType {
        DataType::Int
    }

    fn read_value(&self, buf: &mut dyn Buf, _reader: &BinaryReader) -> Result<Value> {
        read_i32(buf).map(Value::Int)
    }

    fn write_value(&self, value: &Value, buf: &mut BytesMut, _writer: &BinaryWriter) -> Result<()> {
        match *value {
            Value::Int(v) => {
                buf.put_i32(v);
                Ok(())
            }
            ref other => Err(CodecError::mismatch(DataType::Int, other)),
        }
    }
}

impl TypeSerializer for LongSerializer {
    fn data_type(&self) -> DataType {
        DataType::Long
    }

    fn read_value(&self, buf: &mut dyn Buf, _reader: &BinaryReader) -> Result<Value> {
        read_i64(buf).map(Value::Long)
    }

    fn write_value(&self, value: &Value, buf: &mut BytesMut, _writer: &BinaryWriter) -> Result<()> {
        match *value {
            Value::Long(v) => {
                buf.put_i64(v);
                Ok(())
            }
            ref other => Err(CodecError::mismatch(DataType::Long, other)),
        }
    }
}

impl TypeSerializer for ShortSerializer {
    fn data_type(&self) -> DataType {
        DataType::Short
    }

    fn read_value(&self, buf: &mut dyn Buf, _reader: &BinaryReader) -> Result<Value> {
        read_i16(buf).map(Value::Short)
    }

    fn write_value(&self, value: &Value, buf: &mut BytesMut, _writer: &BinaryWriter) -> Result<()> {
        match *value {
            Value::Short(v) => {
                buf.put_i16(v);
                Ok(())
            }
            ref other => Err(CodecError::mismatch(DataType::Short, other)),
        }
    }
}

impl TypeSerializer for ByteSerializer {
    fn data_type(&self) -> DataType {
        DataType::Byte
    }

    fn read_value(&self, buf: &mut dyn Buf, _reader: &BinaryReader) -> Result<Value> {
        read_i8(buf).map(Value::Byte)
    }

    fn write_value(&self, value: &Value, buf: &mut BytesMut, _writer: &BinaryWriter) -> Result<()> {
        match *value {
            Value::Byte(v) => {
                buf.put_i8(v);
                Ok(())
            }
            ref other => Err(CodecError::mismatch(DataType::Byte, other)),
        }
    }
}

impl TypeSerializer for DoubleSerializer {
    fn data_type(&self) -> DataType {
        DataType::Double
    }

    fn read_value(&self, buf: &mut dyn Buf, _reader: &BinaryReader) -> Result<Value> {
        read_f64(buf).map(Value::Double)
    }

    fn write_value(&self, value: &Value, buf: &mut BytesMut, _writer: &BinaryWriter) -> Result<()> {
        match *value {
            Value::Double(v) => {
                buf.put_f64(v);
                Ok(())
            }
            ref other => Err(CodecError::mismatch(DataType::Double, other)),
        }
    }
}

impl TypeSerializer for FloatSerializer {
    fn data_type(&self) -> DataType {
        DataType::Float
    }

    fn read_value(&self, buf: &mut dyn Buf, _reader: &BinaryReader) -> Result<Value> {
        read_f32(buf).map(Value::Float)
    }

    fn write_value(&self, value: &Value, buf: &mut BytesMut, _writer: &BinaryWriter) -> Result<()> {
        match *value {
            Value::Float(v) => {
                buf.put_f32(v);
                Ok(())
            }
            ref other => Err(CodecError::mismatch(DataType::Float, other)),
        }
    }
}

impl TypeSerializer for BooleanSerializer {
    fn data_type(&self) -> DataType {
        DataType::Boolean
    }

    fn read_value(&self, buf: &mut dyn Buf, _reader: &BinaryReader) -> Result<Value> {
        match read_u8(buf)? {
            0x00 => Ok(Value::Boolean(false)),
            0x01 => Ok(Value::Boolean(true)),
            other => Err(CodecError::Decode(format!("Invalid boolean byte 0x{:02x}", other))),
        }
    }

    fn write_value(&self, value: &Value, buf: &mut BytesMut, _writer: &BinaryWriter) -> Result<()> {
        match *value {
            Value::Boolean(v) => {
                buf.put_u8(v as u8);
                Ok(())
            }
            ref other => Err(CodecError::mismatch(DataType::Boolean, other)),
        }
    }
}

impl TypeSerializer for UuidSerializer {
    fn data_type(&self) -> DataType {
        DataType::Uuid
    }

    fn read_value(&self, buf: &mut dyn Buf, _reader: &BinaryReader) -> Result<Value> {
        read_u128(buf).map(|bits| Value::Uuid(Uuid::from_u128(bits)))
    }

    fn write_value(&self, value: &Value, buf: &mut BytesMut, _writer: &BinaryWriter) -> Result<()> {
        match value {
            Value::Uuid(id) => {
                buf.put_u128(id.as_u128());
                Ok(())
            }
            other => Err(CodecError::mismatch(DataType::Uuid, other)),
        }
    }
}
