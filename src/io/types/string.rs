//! STRING: `[i32 byte length][UTF-8 bytes]`, no terminator.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{CodecError, Result};
use crate::io::buffer::{length_to_i32, read_bytes, read_length};
use crate::io::{BinaryReader, BinaryWriter, DataType, Value};
use super::TypeSerializer;

pub struct StringSerializer;

/// Read a bare string payload.
pub(crate) fn read_string(buf: &mut dyn Buf) -> Result<String> {
    let len = read_length(buf)?;
    let bytes = read_bytes(buf, len)?;
    String::from_utf8(bytes.to_vec())
        .map_err(|e| CodecError::Decode(format!("Invalid UTF-8 in string: {}", e)))
}

/// Write a bare string payload.
pub(crate) fn write_string(s: &str, buf: &mut BytesMut) -> Result<()> {
    buf.put_i32(length_to_i32(s.len())?);
    buf.put_slice(s.as_bytes());
    Ok(())
}

impl TypeSerializer for StringSerializer {
    fn data_type(&self) -> DataType {
        DataType::String
    }

    fn read_value(&self, buf: &mut dyn Buf, _reader: &BinaryReader) -> Result<Value> {
        read_string(buf).map(Value::String)
    }

    fn write_value(&self, value: &Value, buf: &mut BytesMut, _writer: &BinaryWriter) -> Result<()> {
        match value {
            Value::String(s) => write_string(s, buf),
            other => Err(CodecError::mismatch(DataType::String, other)),
        }
    }
}
