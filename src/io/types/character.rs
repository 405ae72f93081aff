//! CHAR: one UTF-8 encoded character, no length prefix.
//!
//! The value is self-delimiting: the leading byte's high bits give the
//! sequence length, following the UTF-8 leading-byte pattern.
//!
//! Only the first code point of the decoded bytes is kept. A leading byte
//! whose length pattern does not match the bytes after it is not corrected
//! for; anything past the first code point is dropped.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{CodecError, Result};
use crate::io::buffer::{read_bytes, read_u8};
use crate::io::{BinaryReader, BinaryWriter, DataType, Value};
use super::TypeSerializer;

pub struct CharSerializer;

/// Byte length of a UTF-8 sequence from its leading byte.
fn sequence_len(first_byte: u8) -> usize {
    if first_byte & 0x80 == 0 {
        1
    } else if first_byte & 0xf0 == 0xf0 {
        4
    } else if first_byte & 0xe0 == 0xe0 {
        3
    } else if first_byte & 0xc0 == 0xc0 {
        2
    } else {
        1
    }
}

impl TypeSerializer for CharSerializer {
    fn data_type(&self) -> DataType {
        DataType::Char
    }

    fn read_value(&self, buf: &mut dyn Buf, _reader: &BinaryReader) -> Result<Value> {
        let first_byte = read_u8(buf)?;
        let len = sequence_len(first_byte);

        let mut bytes = [0u8; 4];
        bytes[0] = first_byte;
        if len > 1 {
            bytes[1..len].copy_from_slice(&read_bytes(buf, len - 1)?);
        }

        let decoded = std::str::from_utf8(&bytes[..len])
            .map_err(|e| CodecError::Decode(format!("Invalid UTF-8 in char: {}", e)))?;

        decoded
            .chars()
            .next()
            .map(Value::Char)
            .ok_or_else(|| CodecError::Decode("Empty char sequence".to_string()))
    }

    fn write_value(&self, value: &Value, buf: &mut BytesMut, _writer: &BinaryWriter) -> Result<()> {
        let Value::Char(c) = value else {
            return Err(CodecError::mismatch(DataType::Char, value));
        };
        let mut encoded = [0u8; 4];
        buf.put_slice(c.encode_utf8(&mut encoded).as_bytes());
        Ok(())
    }
}
